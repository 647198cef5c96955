//! # Presentation Adapters
//!
//! Small read-only views over a shared [`DeviceSnapshot`] for whatever front
//! end displays the charger: sensors, adjustable numbers and switches. Each
//! adapter only knows how to read its value from a snapshot and, for numbers
//! and switches, which command to send through a [`CommandDispatcher`].

use crate::constants::{
    CURRENT_LIMIT_MAX_AMPS, CURRENT_LIMIT_MIN_AMPS, FALLBACK_LIMIT_MAX_AMPS,
    FALLBACK_LIMIT_MIN_AMPS,
};
use crate::dispatcher::{Command, CommandDispatcher};
use crate::error::CommandError;
use crate::payload::snapshot::DeviceSnapshot;
use crate::payload::tables::SessionPolicy;
use serde::Serialize;
use std::fmt;

pub const MANUFACTURER: &str = "ABB";
pub const MODEL: &str = "Terra AC";

/// Identity of the charger as shown to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub serial_number: String,
    pub sw_version: String,
}

impl DeviceInfo {
    pub fn from_snapshot(snapshot: &DeviceSnapshot) -> Self {
        DeviceInfo {
            name: format!("{MANUFACTURER} {MODEL} Charger"),
            manufacturer: MANUFACTURER,
            model: MODEL,
            serial_number: snapshot.serial_number.clone(),
            sw_version: snapshot.firmware_version.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Text(text) => f.write_str(text),
            SensorValue::Integer(value) => write!(f, "{value}"),
            SensorValue::Float(value) => write!(f, "{value:.2}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    ChargingState,
    SerialNumber,
    FirmwareVersion,
    ErrorCode,
    ActivePower,
    EnergyDelivered,
    CurrentL1,
    CurrentL2,
    CurrentL3,
    VoltageL1,
    VoltageL2,
    VoltageL3,
    ActualCurrentLimit,
}

impl SensorKind {
    pub const ALL: [SensorKind; 13] = [
        SensorKind::ChargingState,
        SensorKind::SerialNumber,
        SensorKind::FirmwareVersion,
        SensorKind::ErrorCode,
        SensorKind::ActivePower,
        SensorKind::EnergyDelivered,
        SensorKind::CurrentL1,
        SensorKind::CurrentL2,
        SensorKind::CurrentL3,
        SensorKind::VoltageL1,
        SensorKind::VoltageL2,
        SensorKind::VoltageL3,
        SensorKind::ActualCurrentLimit,
    ];

    /// Stable identifier, suffixed to the device id
    pub fn key(self) -> &'static str {
        match self {
            SensorKind::ChargingState => "charging_state",
            SensorKind::SerialNumber => "serial_number",
            SensorKind::FirmwareVersion => "firmware_version",
            SensorKind::ErrorCode => "error_code",
            SensorKind::ActivePower => "active_power",
            SensorKind::EnergyDelivered => "energy_delivered",
            SensorKind::CurrentL1 => "current_l1",
            SensorKind::CurrentL2 => "current_l2",
            SensorKind::CurrentL3 => "current_l3",
            SensorKind::VoltageL1 => "voltage_l1",
            SensorKind::VoltageL2 => "voltage_l2",
            SensorKind::VoltageL3 => "voltage_l3",
            SensorKind::ActualCurrentLimit => "actual_current_limit",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SensorKind::ChargingState => "Charging State",
            SensorKind::SerialNumber => "Serial Number",
            SensorKind::FirmwareVersion => "Firmware Version",
            SensorKind::ErrorCode => "Error Code",
            SensorKind::ActivePower => "Active Power",
            SensorKind::EnergyDelivered => "Energy Delivered",
            SensorKind::CurrentL1 => "Current L1",
            SensorKind::CurrentL2 => "Current L2",
            SensorKind::CurrentL3 => "Current L3",
            SensorKind::VoltageL1 => "Voltage L1",
            SensorKind::VoltageL2 => "Voltage L2",
            SensorKind::VoltageL3 => "Voltage L3",
            SensorKind::ActualCurrentLimit => "Actual Current Limit",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            SensorKind::ActivePower => Some("W"),
            SensorKind::EnergyDelivered => Some("Wh"),
            SensorKind::CurrentL1
            | SensorKind::CurrentL2
            | SensorKind::CurrentL3
            | SensorKind::ActualCurrentLimit => Some("A"),
            SensorKind::VoltageL1 | SensorKind::VoltageL2 | SensorKind::VoltageL3 => Some("V"),
            _ => None,
        }
    }

    /// Hidden unless the user asks for them
    pub fn enabled_by_default(self) -> bool {
        !matches!(self, SensorKind::SerialNumber | SensorKind::FirmwareVersion)
    }

    pub fn value(self, snapshot: &DeviceSnapshot) -> SensorValue {
        match self {
            SensorKind::ChargingState => SensorValue::Text(snapshot.charging_state_description()),
            SensorKind::SerialNumber => SensorValue::Text(snapshot.serial_number.clone()),
            SensorKind::FirmwareVersion => SensorValue::Text(snapshot.firmware_version.clone()),
            SensorKind::ErrorCode => SensorValue::Text(match snapshot.error_code {
                0 => "No error".to_string(),
                code => code.to_string(),
            }),
            SensorKind::ActivePower => SensorValue::Float(snapshot.active_power),
            SensorKind::EnergyDelivered => SensorValue::Float(snapshot.energy_delivered),
            // Phase currents are shown in whole amps
            SensorKind::CurrentL1 => whole_amps(snapshot.charging_current_l1),
            SensorKind::CurrentL2 => whole_amps(snapshot.charging_current_l2),
            SensorKind::CurrentL3 => whole_amps(snapshot.charging_current_l3),
            SensorKind::VoltageL1 => SensorValue::Float(snapshot.voltage_l1),
            SensorKind::VoltageL2 => SensorValue::Float(snapshot.voltage_l2),
            SensorKind::VoltageL3 => SensorValue::Float(snapshot.voltage_l3),
            SensorKind::ActualCurrentLimit => SensorValue::Float(snapshot.charging_current_limit),
        }
    }
}

fn whole_amps(amps: f64) -> SensorValue {
    SensorValue::Integer(amps.round() as i64)
}

/// Adjustable values, sent as commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    ChargingCurrentLimit,
    FallbackLimit,
}

impl NumberKind {
    pub const ALL: [NumberKind; 2] = [NumberKind::ChargingCurrentLimit, NumberKind::FallbackLimit];

    pub fn key(self) -> &'static str {
        match self {
            NumberKind::ChargingCurrentLimit => "current_limit",
            NumberKind::FallbackLimit => "fallback_limit",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NumberKind::ChargingCurrentLimit => "Charging Current Limit",
            NumberKind::FallbackLimit => "Fallback Limit",
        }
    }

    /// (min, max, step) in amps
    pub fn range(self) -> (f64, f64, f64) {
        match self {
            NumberKind::ChargingCurrentLimit => (CURRENT_LIMIT_MIN_AMPS, CURRENT_LIMIT_MAX_AMPS, 1.0),
            NumberKind::FallbackLimit => (
                f64::from(FALLBACK_LIMIT_MIN_AMPS),
                f64::from(FALLBACK_LIMIT_MAX_AMPS),
                1.0,
            ),
        }
    }

    /// The charging limit shows the value last written over Modbus in whole
    /// amps, not the limit currently applied.
    pub fn value(self, snapshot: &DeviceSnapshot) -> f64 {
        match self {
            NumberKind::ChargingCurrentLimit => snapshot.charging_current_limit_modbus.trunc(),
            NumberKind::FallbackLimit => f64::from(snapshot.fallback_limit),
        }
    }

    pub fn command(self, value: f64) -> Result<Command, CommandError> {
        match self {
            NumberKind::ChargingCurrentLimit => Ok(Command::SetCurrentLimit(value)),
            NumberKind::FallbackLimit => {
                let (min, max, _) = self.range();
                if !(min..=max).contains(&value) {
                    return Err(CommandError::OutOfRange {
                        command: "set_fallback_limit",
                        value,
                        min,
                        max,
                    });
                }
                Ok(Command::SetFallbackLimit(value.trunc() as u16))
            }
        }
    }

    pub async fn set(self, dispatcher: &CommandDispatcher, value: f64) -> Result<(), CommandError> {
        dispatcher.execute(self.command(value)?).await
    }
}

/// On/off controls whose state is derived from the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchKind {
    ChargingSession,
    CableLock,
}

impl SwitchKind {
    pub const ALL: [SwitchKind; 2] = [SwitchKind::ChargingSession, SwitchKind::CableLock];

    pub fn key(self) -> &'static str {
        match self {
            SwitchKind::ChargingSession => "charging",
            SwitchKind::CableLock => "lock",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SwitchKind::ChargingSession => "Start/Stop Charging",
            SwitchKind::CableLock => "Lock Cable",
        }
    }

    pub fn is_on(self, snapshot: &DeviceSnapshot, policy: &SessionPolicy) -> bool {
        match self {
            SwitchKind::ChargingSession => snapshot.is_session_active(policy),
            SwitchKind::CableLock => snapshot.is_cable_locked(policy),
        }
    }

    pub fn on_command(self) -> Command {
        match self {
            SwitchKind::ChargingSession => Command::StartCharging,
            SwitchKind::CableLock => Command::LockCable,
        }
    }

    pub fn off_command(self) -> Command {
        match self {
            SwitchKind::ChargingSession => Command::StopCharging,
            SwitchKind::CableLock => Command::UnlockCable,
        }
    }

    pub async fn turn_on(self, dispatcher: &CommandDispatcher) -> Result<(), CommandError> {
        dispatcher.execute(self.on_command()).await
    }

    pub async fn turn_off(self, dispatcher: &CommandDispatcher) -> Result<(), CommandError> {
        dispatcher.execute(self.off_command()).await
    }
}
