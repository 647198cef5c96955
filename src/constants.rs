//! Terra AC Register Map Constants
//!
//! This module defines the Modbus/TCP register map of the ABB Terra AC wallbox.
//! All addresses are decimal holding-register addresses, all words big-endian.

/// Default Modbus/TCP port
pub const DEFAULT_PORT: u16 = 502;

/// Default Modbus unit (slave) id
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Default poll period in seconds
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 15;

// ----------------------------------------------------------------------------
// Bulk read block (4000h)
// ----------------------------------------------------------------------------

/// First register of the status block
pub const BULK_READ_BASE: u16 = 16384;

/// Number of registers in the status block, serial number through fallback limit
pub const BULK_READ_COUNT: u16 = 37;

// Offsets within the status block
pub const OFFSET_SERIAL_NUMBER: usize = 0;
pub const OFFSET_FIRMWARE_VERSION: usize = 4;
pub const OFFSET_USER_MAX_CURRENT: usize = 6;
pub const OFFSET_ERROR_CODE: usize = 8;
pub const OFFSET_SOCKET_LOCK_STATE: usize = 10;
pub const OFFSET_CHARGING_STATE: usize = 13;
pub const OFFSET_CURRENT_LIMIT: usize = 14;
pub const OFFSET_CURRENT_L1: usize = 16;
pub const OFFSET_CURRENT_L2: usize = 18;
pub const OFFSET_CURRENT_L3: usize = 20;
pub const OFFSET_VOLTAGE_L1: usize = 22;
pub const OFFSET_VOLTAGE_L2: usize = 24;
pub const OFFSET_VOLTAGE_L3: usize = 26;
pub const OFFSET_ACTIVE_POWER: usize = 28;
pub const OFFSET_ENERGY_DELIVERED: usize = 30;
pub const OFFSET_COMMUNICATION_TIMEOUT: usize = 32;
pub const OFFSET_CURRENT_LIMIT_ECHO: usize = 34;
pub const OFFSET_FALLBACK_LIMIT: usize = 36;

/// Serial number occupies four registers
pub const SERIAL_NUMBER_WORDS: u16 = 4;

/// Firmware version occupies two registers
pub const FIRMWARE_VERSION_WORDS: usize = 2;

// ----------------------------------------------------------------------------
// Command registers (4100h)
// ----------------------------------------------------------------------------

/// Charging current limit, two words, milliamps
pub const REG_CURRENT_LIMIT: u16 = 16640;

/// Cable lock control: 0 = unlock, 1 = lock
pub const REG_LOCK_CONTROL: u16 = 16643;

/// Session control: 0 = start, 1 = stop
pub const REG_SESSION_CONTROL: u16 = 16645;

/// Fallback limit in whole amps
pub const REG_FALLBACK_LIMIT: u16 = 16649;

pub const LOCK_VALUE: u16 = 1;
pub const UNLOCK_VALUE: u16 = 0;
pub const START_SESSION_VALUE: u16 = 0;
pub const STOP_SESSION_VALUE: u16 = 1;

// ----------------------------------------------------------------------------
// Scaling and limits
// ----------------------------------------------------------------------------

/// Resolution of current quantities (mA -> A)
pub const CURRENT_RESOLUTION: f64 = 0.001;

/// Resolution of voltage quantities (0.1 V -> V)
pub const VOLTAGE_RESOLUTION: f64 = 0.1;

pub const CURRENT_LIMIT_MIN_AMPS: f64 = 0.0;
pub const CURRENT_LIMIT_MAX_AMPS: f64 = 32.0;

pub const FALLBACK_LIMIT_MIN_AMPS: u16 = 6;
pub const FALLBACK_LIMIT_MAX_AMPS: u16 = 32;

/// Value written when the station reports an out-of-range fallback limit
pub const FALLBACK_LIMIT_CORRECTION: u16 = 6;

/// Fixed prefix of every Terra AC serial number
pub const SERIAL_NUMBER_PREFIX: &str = "TACW22";
