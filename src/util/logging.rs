//! # Throttled and Hex-Dump Logging
//!
//! A gateway that sees a misconfigured key or a noisy device can receive the
//! same bad frame hundreds of times a minute. `LogThrottle` caps how often a
//! warning is emitted per time window; `log_frame_hex` prints bounded hex
//! dumps of frames at debug level.
//!
//! ## Usage
//!
//! ```rust
//! use loraraw_rs::util::logging::{log_frame_hex, LogThrottle};
//!
//! let mut throttle = LogThrottle::new(1000, 5); // 5 messages per second
//! if throttle.allow() {
//!     log::warn!("incorrect CMAC or Key");
//! }
//! log_frame_hex("Received envelope", &[0xCB, 0xB2, 0x72, 0xEA]);
//! ```

use std::time::Instant;

/// Rate limiter for repeated log messages
#[derive(Debug)]
pub struct LogThrottle {
    /// Time window for throttling (in milliseconds)
    window_ms: u64,
    /// Maximum messages allowed per window
    cap: u32,
    /// Current message count in window
    count: u32,
    /// Start time of current window
    t0: Instant,
}

impl LogThrottle {
    /// Allow at most `cap` messages every `window_ms` milliseconds
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            t0: Instant::now(),
        }
    }

    /// Returns `true` if the message should be logged. The counter resets
    /// once the window has expired.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.t0).as_millis() as u64;

        if elapsed_ms > self.window_ms {
            self.t0 = now;
            self.count = 0;
        }

        self.count = self.count.saturating_add(1);
        self.count <= self.cap
    }
}

/// Log frame data in hex at debug level, capped at 64 bytes
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    const MAX_LOG_BYTES: usize = 64;

    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let hex_str = crate::util::hex::format_hex_compact(shown);
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };

    log::debug!(target: "loraraw::frame", "{prefix}: {hex_str}{suffix}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_throttle_basic() {
        let mut throttle = LogThrottle::new(1000, 3);

        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(throttle.allow());

        assert!(!throttle.allow());
        assert!(!throttle.allow());
    }

    #[test]
    fn test_log_throttle_window_expiry() {
        let mut throttle = LogThrottle::new(0, 1);

        assert!(throttle.allow());
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(throttle.allow());
    }

    #[test]
    fn test_log_frame_hex_handles_long_frames() {
        // Should not panic on empty or oversized input
        log_frame_hex("empty", &[]);
        log_frame_hex("long", &[0xAA; 200]);
    }
}
