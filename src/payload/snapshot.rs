//! # Device Snapshot
//!
//! One complete, internally consistent set of decoded fields produced from a
//! single bulk read of the status block. A snapshot is never mutated after it
//! is published; each poll builds a new one.

use crate::constants::*;
use crate::error::DecodeError;
use crate::payload::data_encoding::{
    decode_charging_state, decode_firmware_version, decode_scaled32, decode_serial_number,
    decode_u32,
};
use crate::payload::tables::{
    describe_charging_state, describe_error_code, describe_socket_lock_state, ChargingState,
    ErrorFlags, SessionPolicy,
};
use serde::Serialize;

/// Decoded state of the station at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub serial_number: String,
    pub firmware_version: String,
    /// Amps
    pub user_settable_max_current: f64,
    /// Amps, the limit the station currently applies
    pub charging_current_limit: f64,
    /// Amps, the limit last written over Modbus
    pub charging_current_limit_modbus: f64,
    /// Bitmask, 0 = no error
    pub error_code: u16,
    pub socket_lock_state: u32,
    /// Derived nibble, 0..=5 for known states
    pub charging_state: u8,
    pub charging_current_l1: f64,
    pub charging_current_l2: f64,
    pub charging_current_l3: f64,
    pub voltage_l1: f64,
    pub voltage_l2: f64,
    pub voltage_l3: f64,
    /// Watts
    pub active_power: f64,
    /// Watt-hours
    pub energy_delivered: f64,
    /// Seconds
    pub communication_timeout: u16,
    /// Amps, 6..=32 when healthy
    pub fallback_limit: u16,
}

impl DeviceSnapshot {
    /// Decodes a full status block.
    ///
    /// `serial_number` is the value cached from an earlier poll; when `None`
    /// the serial registers are decoded. Fails only when the block is shorter
    /// than [`BULK_READ_COUNT`] registers; undecodable text fields become
    /// placeholders.
    pub fn decode(registers: &[u16], serial_number: Option<&str>) -> Result<Self, DecodeError> {
        if registers.len() < BULK_READ_COUNT as usize {
            return Err(DecodeError::WrongLength {
                field: "status_block",
                expected: BULK_READ_COUNT as usize,
                got: registers.len(),
            });
        }

        let pair = |offset: usize| (registers[offset], registers[offset + 1]);
        let scaled = |offset: usize, resolution: f64| {
            let (hi, lo) = pair(offset);
            decode_scaled32(hi, lo, resolution)
        };

        let serial_number = match serial_number {
            Some(cached) => cached.to_string(),
            None => decode_serial_number(
                &registers[OFFSET_SERIAL_NUMBER..OFFSET_SERIAL_NUMBER + SERIAL_NUMBER_WORDS as usize],
            ),
        };
        let (lock_hi, lock_lo) = pair(OFFSET_SOCKET_LOCK_STATE);

        Ok(DeviceSnapshot {
            serial_number,
            firmware_version: decode_firmware_version(
                &registers[OFFSET_FIRMWARE_VERSION..OFFSET_FIRMWARE_VERSION + FIRMWARE_VERSION_WORDS],
            ),
            user_settable_max_current: scaled(OFFSET_USER_MAX_CURRENT, CURRENT_RESOLUTION),
            charging_current_limit: scaled(OFFSET_CURRENT_LIMIT, CURRENT_RESOLUTION),
            charging_current_limit_modbus: scaled(OFFSET_CURRENT_LIMIT_ECHO, CURRENT_RESOLUTION),
            error_code: registers[OFFSET_ERROR_CODE],
            socket_lock_state: decode_u32(lock_hi, lock_lo),
            charging_state: decode_charging_state(registers[OFFSET_CHARGING_STATE]),
            charging_current_l1: scaled(OFFSET_CURRENT_L1, CURRENT_RESOLUTION),
            charging_current_l2: scaled(OFFSET_CURRENT_L2, CURRENT_RESOLUTION),
            charging_current_l3: scaled(OFFSET_CURRENT_L3, CURRENT_RESOLUTION),
            voltage_l1: scaled(OFFSET_VOLTAGE_L1, VOLTAGE_RESOLUTION),
            voltage_l2: scaled(OFFSET_VOLTAGE_L2, VOLTAGE_RESOLUTION),
            voltage_l3: scaled(OFFSET_VOLTAGE_L3, VOLTAGE_RESOLUTION),
            active_power: scaled(OFFSET_ACTIVE_POWER, 1.0),
            energy_delivered: scaled(OFFSET_ENERGY_DELIVERED, 1.0),
            communication_timeout: registers[OFFSET_COMMUNICATION_TIMEOUT],
            fallback_limit: registers[OFFSET_FALLBACK_LIMIT],
        })
    }

    pub fn charging_state(&self) -> Option<ChargingState> {
        ChargingState::from_code(self.charging_state)
    }

    pub fn charging_state_description(&self) -> String {
        describe_charging_state(self.charging_state)
    }

    pub fn socket_lock_description(&self) -> String {
        describe_socket_lock_state(self.socket_lock_state)
    }

    pub fn error_flags(&self) -> ErrorFlags {
        ErrorFlags::from_bits_retain(self.error_code)
    }

    pub fn error_description(&self) -> String {
        describe_error_code(self.error_code)
    }

    pub fn is_session_active(&self, policy: &SessionPolicy) -> bool {
        policy.is_session_active(self.charging_state)
    }

    pub fn is_cable_locked(&self, policy: &SessionPolicy) -> bool {
        policy.is_cable_locked(self.socket_lock_state)
    }

    /// Whether the fallback limit is outside what the station accepts.
    pub fn fallback_limit_out_of_range(&self) -> bool {
        self.fallback_limit > FALLBACK_LIMIT_MAX_AMPS
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} state={} limit={:.1}A power={:.0}W energy={:.0}Wh fallback={}A error=0x{:04X}",
            self.serial_number,
            self.charging_state,
            self.charging_current_limit,
            self.active_power,
            self.energy_delivered,
            self.fallback_limit,
            self.error_code
        )
    }
}
