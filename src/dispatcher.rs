//! # Command Dispatcher
//!
//! Validates and issues write commands to the station. Every command follows
//! the same path: validate the input range, encode the register payload,
//! write through the coordinator's shared connection, then ask the
//! coordinator for a follow-up poll once the command's settle duration has
//! passed. The call returns as soon as the write completes; the settle delay
//! never blocks the caller.

use crate::config::SettleDurations;
use crate::constants::*;
use crate::coordinator::ChargerCoordinator;
use crate::error::CommandError;
use crate::payload::data_encoding::encode_current_command;
use log::{info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Settle duration category of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleClass {
    CurrentLimit,
    FallbackLimit,
    SessionControl,
    CableLock,
}

impl SettleClass {
    pub fn duration(self, settle: &SettleDurations) -> Duration {
        match self {
            SettleClass::CurrentLimit => settle.current_limit(),
            SettleClass::FallbackLimit => settle.fallback_limit(),
            SettleClass::SessionControl => settle.session_control(),
            SettleClass::CableLock => settle.cable_lock(),
        }
    }
}

/// A write request to the station
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Charging current limit in amps, 0..=32. Below 6 A the station pauses.
    SetCurrentLimit(f64),
    /// Limit applied when Modbus communication is lost, 6..=32 A
    SetFallbackLimit(u16),
    StartCharging,
    StopCharging,
    LockCable,
    UnlockCable,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetCurrentLimit(_) => "set_current_limit",
            Command::SetFallbackLimit(_) => "set_fallback_limit",
            Command::StartCharging => "start_charging",
            Command::StopCharging => "stop_charging",
            Command::LockCable => "lock_cable",
            Command::UnlockCable => "unlock_cable",
        }
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        match *self {
            Command::SetCurrentLimit(amps) => {
                if !(CURRENT_LIMIT_MIN_AMPS..=CURRENT_LIMIT_MAX_AMPS).contains(&amps) {
                    return Err(CommandError::OutOfRange {
                        command: self.name(),
                        value: amps,
                        min: CURRENT_LIMIT_MIN_AMPS,
                        max: CURRENT_LIMIT_MAX_AMPS,
                    });
                }
            }
            Command::SetFallbackLimit(amps) => {
                if !(FALLBACK_LIMIT_MIN_AMPS..=FALLBACK_LIMIT_MAX_AMPS).contains(&amps) {
                    return Err(CommandError::OutOfRange {
                        command: self.name(),
                        value: f64::from(amps),
                        min: f64::from(FALLBACK_LIMIT_MIN_AMPS),
                        max: f64::from(FALLBACK_LIMIT_MAX_AMPS),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// First register written
    pub fn address(&self) -> u16 {
        match self {
            Command::SetCurrentLimit(_) => REG_CURRENT_LIMIT,
            Command::SetFallbackLimit(_) => REG_FALLBACK_LIMIT,
            Command::StartCharging | Command::StopCharging => REG_SESSION_CONTROL,
            Command::LockCable | Command::UnlockCable => REG_LOCK_CONTROL,
        }
    }

    /// Register words to write at [`address`](Self::address). Only meaningful
    /// for a command that passed [`validate`](Self::validate).
    pub fn payload(&self) -> Vec<u16> {
        match *self {
            Command::SetCurrentLimit(amps) => {
                let (hi, lo) = encode_current_command(amps);
                vec![hi, lo]
            }
            Command::SetFallbackLimit(amps) => vec![amps],
            Command::StartCharging => vec![START_SESSION_VALUE],
            Command::StopCharging => vec![STOP_SESSION_VALUE],
            Command::LockCable => vec![LOCK_VALUE],
            Command::UnlockCable => vec![UNLOCK_VALUE],
        }
    }

    pub fn settle_class(&self) -> SettleClass {
        match self {
            Command::SetCurrentLimit(_) => SettleClass::CurrentLimit,
            Command::SetFallbackLimit(_) => SettleClass::FallbackLimit,
            Command::StartCharging | Command::StopCharging => SettleClass::SessionControl,
            Command::LockCable | Command::UnlockCable => SettleClass::CableLock,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetCurrentLimit(amps) => write!(f, "{}({amps} A)", self.name()),
            Command::SetFallbackLimit(amps) => write!(f, "{}({amps} A)", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

/// Issues commands through a shared [`ChargerCoordinator`]
#[derive(Clone)]
pub struct CommandDispatcher {
    coordinator: Arc<ChargerCoordinator>,
    settle: SettleDurations,
}

impl CommandDispatcher {
    pub fn new(coordinator: Arc<ChargerCoordinator>, settle: SettleDurations) -> Self {
        CommandDispatcher {
            coordinator,
            settle,
        }
    }

    pub fn coordinator(&self) -> &Arc<ChargerCoordinator> {
        &self.coordinator
    }

    pub fn settle(&self) -> &SettleDurations {
        &self.settle
    }

    /// Validates, writes and schedules the follow-up poll.
    ///
    /// Errors leave the cached snapshot untouched and schedule nothing.
    pub async fn execute(&self, command: Command) -> Result<(), CommandError> {
        command.validate()?;

        let address = command.address();
        let payload = command.payload();
        if let Err(e) = self.coordinator.write_registers(address, &payload).await {
            let err = CommandError::from(e);
            warn!("{command} failed: {err}");
            return Err(err);
        }

        let delay = command.settle_class().duration(&self.settle);
        info!("{command} written to {address}, refreshing in {delay:?}");
        self.coordinator.request_refresh(delay);
        Ok(())
    }

    pub async fn set_current_limit(&self, amps: f64) -> Result<(), CommandError> {
        self.execute(Command::SetCurrentLimit(amps)).await
    }

    pub async fn set_fallback_limit(&self, amps: u16) -> Result<(), CommandError> {
        self.execute(Command::SetFallbackLimit(amps)).await
    }

    pub async fn start_charging(&self) -> Result<(), CommandError> {
        self.execute(Command::StartCharging).await
    }

    pub async fn stop_charging(&self) -> Result<(), CommandError> {
        self.execute(Command::StopCharging).await
    }

    pub async fn lock_cable(&self) -> Result<(), CommandError> {
        self.execute(Command::LockCable).await
    }

    pub async fn unlock_cable(&self) -> Result<(), CommandError> {
        self.execute(Command::UnlockCable).await
    }
}
