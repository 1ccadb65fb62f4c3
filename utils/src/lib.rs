//! Shared utilities for Concord.

pub mod clock;
pub mod expiring_cache;
pub mod time;

pub use clock::{Clock, MonotonicClock};
pub use expiring_cache::{CacheInfo, ExpiringCache};
pub use time::format_duration;
