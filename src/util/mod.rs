//! # Utility Modules
//!
//! Hex rendering of register words and logging helpers used throughout the
//! terra-ac-rs crate.

pub mod hex;
pub mod logging;

pub use hex::{decode_registers, encode_registers, format_registers_compact, format_registers_list};
pub use logging::{log_poll_failure, log_registers_hex, LogThrottle};
