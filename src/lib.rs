//! # terra-ac - Modbus/TCP Poller for ABB Terra AC Wallboxes
//!
//! The terra-ac crate reads the status block of an ABB Terra AC charging
//! station over Modbus/TCP, decodes it into a typed [`DeviceSnapshot`] and
//! sends commands back to the station: charging current limit, fallback
//! limit, session start/stop and cable lock.
//!
//! ## Features
//!
//! - One bulk read of the 37-register status block per poll, so every field
//!   comes from the same Modbus transaction
//! - Decoding of serial number, firmware version, scaled currents, voltages,
//!   power and energy
//! - Automatic correction of out-of-range fallback limits reported by some
//!   firmware revisions
//! - Commands with per-command settle durations and a deferred follow-up poll
//! - Configurable policy for the derived "session active" and "cable locked"
//!   views
//!
//! ## Usage
//!
//! ```rust,no_run
//! use terra_ac::{ChargerConfig, ChargerCoordinator, CommandDispatcher};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ChargerConfig {
//!     host: "192.168.1.40".into(),
//!     ..ChargerConfig::default()
//! };
//! let coordinator = ChargerCoordinator::from_config(&config);
//! let snapshot = coordinator.poll().await?;
//! println!("{}", snapshot.charging_state_description());
//!
//! let dispatcher = CommandDispatcher::new(coordinator, config.settle);
//! dispatcher.set_current_limit(16.0).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod coordinator;
pub mod dispatcher;
pub mod entities;
pub mod error;
pub mod logging;
pub mod modbus;
pub mod payload;
pub mod scheduler;
pub mod util;

pub use crate::error::{CommandError, ConfigError, DecodeError, PollError, TransportError};
pub use crate::logging::{init_logger, init_logger_with_default, log_info, log_warn};

pub use config::{ChargerConfig, SettleDurations};
pub use coordinator::{ChargerCoordinator, ConnectionState};
pub use dispatcher::{Command, CommandDispatcher, SettleClass};
pub use entities::{DeviceInfo, NumberKind, SensorKind, SensorValue, SwitchKind};
pub use modbus::{validate_connection, MockTransport, RegisterTransport, TcpTransport};
pub use payload::{ChargingState, DeviceSnapshot, ErrorFlags, SessionPolicy, SocketLockState};
pub use scheduler::{PollScheduler, SchedulerStats};
