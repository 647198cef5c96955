//! # Charger Configuration
//!
//! Connection parameters, timeouts, settle durations and the session policy.
//! Built from defaults, an optional JSON file, then command-line overrides.
//!
//! ```rust
//! use terra_ac::config::ChargerConfig;
//!
//! let config: ChargerConfig =
//!     serde_json::from_str(r#"{"host": "192.168.1.40", "scan_interval_secs": 30}"#).unwrap();
//! assert_eq!(config.port, 502);
//! assert!(config.validate().is_ok());
//! ```

use crate::constants::{DEFAULT_PORT, DEFAULT_SCAN_INTERVAL_SECS, DEFAULT_UNIT_ID};
use crate::error::ConfigError;
use crate::payload::tables::SessionPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How long the station needs to reflect each kind of command, in
/// milliseconds. The dispatcher defers its follow-up poll by this much.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleDurations {
    pub current_limit_ms: u64,
    pub fallback_limit_ms: u64,
    pub session_control_ms: u64,
    pub cable_lock_ms: u64,
}

impl Default for SettleDurations {
    fn default() -> Self {
        SettleDurations {
            current_limit_ms: 0,
            fallback_limit_ms: 0,
            session_control_ms: 7_000,
            cable_lock_ms: 3_000,
        }
    }
}

impl SettleDurations {
    /// No settle delay at all, for tests and simulators
    pub fn immediate() -> Self {
        SettleDurations {
            current_limit_ms: 0,
            fallback_limit_ms: 0,
            session_control_ms: 0,
            cable_lock_ms: 0,
        }
    }

    pub fn current_limit(&self) -> Duration {
        Duration::from_millis(self.current_limit_ms)
    }

    pub fn fallback_limit(&self) -> Duration {
        Duration::from_millis(self.fallback_limit_ms)
    }

    pub fn session_control(&self) -> Duration {
        Duration::from_millis(self.session_control_ms)
    }

    pub fn cable_lock(&self) -> Duration {
        Duration::from_millis(self.cable_lock_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargerConfig {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    pub scan_interval_secs: u64,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub validation_timeout_ms: u64,
    pub settle: SettleDurations,
    pub policy: SessionPolicy,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        ChargerConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            unit_id: DEFAULT_UNIT_ID,
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            connect_timeout_ms: 5_000,
            read_timeout_ms: 10_000,
            validation_timeout_ms: 3_000,
            settle: SettleDurations::default(),
            policy: SessionPolicy::default(),
        }
    }
}

impl ChargerConfig {
    /// Loads and validates a JSON configuration file. Missing keys take
    /// their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: ChargerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scan_interval_secs must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("validation_timeout_ms", self.validation_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ChargerConfig::default();
        assert_eq!(config.port, 502);
        assert_eq!(config.unit_id, 1);
        assert_eq!(config.scan_interval(), Duration::from_secs(15));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.validation_timeout(), Duration::from_secs(3));
        assert_eq!(config.settle.session_control(), Duration::from_secs(7));
        assert_eq!(config.settle.cable_lock(), Duration::from_secs(3));
        assert!(config.settle.current_limit().is_zero());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "host": "10.0.0.7",
                "unit_id": 2,
                "settle": {{ "session_control_ms": 5000 }},
                "policy": {{ "charging_active_states": [2, 3, 4, 5] }}
            }}"#
        )
        .unwrap();

        let config = ChargerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.unit_id, 2);
        assert_eq!(config.port, 502);
        assert_eq!(config.settle.session_control_ms, 5000);
        assert_eq!(config.settle.cable_lock_ms, 3000);
        assert_eq!(config.policy, SessionPolicy::include_paused());
    }

    #[test]
    fn test_from_json_file_errors() {
        let missing = ChargerConfig::from_json_file("/nonexistent/terra-ac.json");
        assert!(matches!(missing, Err(ConfigError::Io(_))));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let parsed = ChargerConfig::from_json_file(file.path());
        assert!(matches!(parsed, Err(ConfigError::Parse(_))));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "scan_interval_secs": 0 }}"#).unwrap();
        let invalid = ChargerConfig::from_json_file(file.path());
        assert!(matches!(invalid, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects() {
        let empty_host = ChargerConfig {
            host: "  ".into(),
            ..ChargerConfig::default()
        };
        assert!(empty_host.validate().is_err());

        let zero_port = ChargerConfig {
            port: 0,
            ..ChargerConfig::default()
        };
        assert!(zero_port.validate().is_err());

        let zero_timeout = ChargerConfig {
            read_timeout_ms: 0,
            ..ChargerConfig::default()
        };
        let err = zero_timeout.validate().unwrap_err();
        assert!(err.to_string().contains("read_timeout_ms"));
    }
}
