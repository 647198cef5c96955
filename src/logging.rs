use log::{info, log_enabled, warn, Level, LevelFilter};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the logger with the `env_logger` crate.
///
/// Honors `RUST_LOG`; nothing is printed when it is unset.
pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::try_init();
    });
}

/// Initializes `env_logger` with `level` as the filter when `RUST_LOG` is
/// unset. Safe to call more than once; only the first call takes effect.
///
/// # Examples
/// ```rust
/// use terra_ac::logging::init_logger_with_default;
///
/// init_logger_with_default(log::LevelFilter::Info);
/// log::info!("Charger poller starting");
/// ```
pub fn init_logger_with_default(level: LevelFilter) {
    INIT.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .format_timestamp_millis()
            .try_init();
    });
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logger_with_default(LevelFilter::Debug);
        init_logger();
        init_logger_with_default(LevelFilter::Off);
        log_info("still logging");
        log_warn("warning line");
    }
}
