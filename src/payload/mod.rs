//! # Status Block Payload
//!
//! Decoding of the holding-register payload read from the station: the
//! register codec, the decoded [`DeviceSnapshot`] and the code tables used to
//! interpret it.

pub mod data_encoding;
pub mod snapshot;
pub mod tables;

pub use data_encoding::{
    decode_charging_state, decode_firmware_version, decode_scaled32, decode_serial_number,
    encode_current_command,
};
pub use snapshot::DeviceSnapshot;
pub use tables::{ChargingState, ErrorFlags, SessionPolicy, SocketLockState};
