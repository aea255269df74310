//! Log throttling for repetitive pipeline summaries.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default minimum interval between two `info`-level logs of the same key.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_secs(60);

/// Rate-limits log lines per key.
///
/// Owned by whoever logs (no global state). Results are advisory: a lost
/// update only changes verbosity, never behavior.
#[derive(Debug)]
pub struct LogThrottle {
    interval: Duration,
    last_logged: Mutex<HashMap<String, Instant>>,
}

impl LogThrottle {
    /// Create a throttle with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_logged: Mutex::new(HashMap::new()),
        }
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a line for `key` should be logged now.
    ///
    /// Returns `true` the first time and then at most once per interval.
    /// A poisoned lock lets the line through.
    pub fn should_log(&self, key: &str) -> bool {
        self.should_log_at(key, Instant::now())
    }

    fn should_log_at(&self, key: &str, now: Instant) -> bool {
        let Ok(mut last) = self.last_logged.lock() else {
            return true;
        };
        match last.get(key) {
            Some(previous) if now.saturating_duration_since(*previous) < self.interval => false,
            _ => {
                last.insert(key.to_string(), now);
                true
            }
        }
    }

    /// Forget every key.
    pub fn reset(&self) {
        if let Ok(mut last) = self.last_logged.lock() {
            last.clear();
        }
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_INTERVAL)
    }
}

/// Log at `info` when the throttle allows it, at `debug` otherwise.
#[macro_export]
macro_rules! throttled_info {
    ($throttle:expr, $key:expr, $($arg:tt)+) => {
        if $throttle.should_log($key) {
            ::tracing::info!($($arg)+);
        } else {
            ::tracing::debug!($($arg)+);
        }
    };
}
