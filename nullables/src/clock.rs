//! Nullable clock — deterministic time for testing.

use concord_utils::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to. Safe to share across threads so
/// it can drive caches under concurrent access.
pub struct NullClock {
    current_ms: AtomicU64,
}

impl NullClock {
    pub fn new() -> Self {
        Self {
            current_ms: AtomicU64::new(0),
        }
    }

    /// Advance time by `by`.
    pub fn advance(&self, by: Duration) {
        self.current_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Advance time by a number of seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Default for NullClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for NullClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.current_ms.load(Ordering::SeqCst))
    }
}
