//! # Logging Utilities
//!
//! Rate limiting for repeated warnings and register dumps for protocol
//! debugging.
//!
//! ## Usage
//!
//! ```rust
//! use terra_ac::util::logging::{LogThrottle, log_registers_hex};
//!
//! // At most 3 poll failure warnings per minute
//! let mut throttle = LogThrottle::new(60_000, 3);
//! if throttle.allow() {
//!     log::warn!("Station unreachable");
//! }
//!
//! log_registers_hex("Status block", &[0x4700, 0x0500]);
//! ```

use std::time::Instant;

/// Throttling structure for rate-limiting log messages
///
/// An unreachable station fails every poll; without throttling the log fills
/// with the same warning every scan interval.
#[derive(Debug)]
pub struct LogThrottle {
    /// Time window for throttling (in milliseconds)
    window_ms: u64,
    /// Maximum messages allowed per window
    cap: u32,
    /// Current message count in window
    count: u32,
    /// Messages swallowed since the last reset
    suppressed: u64,
    /// Start time of current window
    t0: Instant,
}

impl LogThrottle {
    /// Create new throttle with time window and message cap
    ///
    /// # Arguments
    /// * `window_ms` - Time window in milliseconds
    /// * `cap` - Maximum messages allowed per window
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            suppressed: 0,
            t0: Instant::now(),
        }
    }

    /// Check if logging is allowed (resets counter after window expires)
    ///
    /// Returns `true` if the message should be logged, `false` if it
    /// should be throttled.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.t0).as_millis() as u64;

        if elapsed_ms > self.window_ms {
            self.t0 = now;
            self.count = 0;
        }

        self.count += 1;
        let allowed = self.count <= self.cap;
        if !allowed {
            self.suppressed += 1;
        }
        allowed
    }

    /// Number of messages swallowed since creation or the last reset
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Reset the throttle (start new window immediately)
    ///
    /// Called once the condition being logged has cleared, so the next
    /// occurrence is reported straight away.
    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.count = 0;
        self.suppressed = 0;
    }
}

/// Log register words in hex at debug level
pub fn log_registers_hex(prefix: &str, registers: &[u16]) {
    const MAX_LOG_WORDS: usize = 40;

    let shown = &registers[..registers.len().min(MAX_LOG_WORDS)];
    let suffix = if registers.len() > MAX_LOG_WORDS {
        format!(" ... ({} words total)", registers.len())
    } else {
        String::new()
    };

    log::debug!(
        target: "terra_ac::registers",
        "{prefix}: {}{suffix}",
        crate::util::hex::format_registers_compact(shown)
    );
}

/// Log a failed poll through a throttle, choosing the level by error class
pub fn log_poll_failure(throttle: &mut LogThrottle, err: &crate::error::PollError) {
    if !throttle.allow() {
        return;
    }
    match err {
        crate::error::PollError::Internal(_) => log::error!("Poll failed: {err}"),
        _ => log::warn!("Poll failed: {err}"),
    }
}
