//! # Modbus Transport
//!
//! The register-level transport used by the coordinator and dispatcher:
//! the [`RegisterTransport`] trait, a Modbus/TCP implementation and an
//! in-memory mock station.

pub mod mock;
pub mod tcp;
pub mod transport;

pub use mock::{MockFailure, MockTransport, MockWrite};
pub use tcp::{validate_connection, TcpTransport};
pub use transport::{read_serial_number, RegisterTransport};
