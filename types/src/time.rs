//! Ledger close time.
//!
//! Close times are whole seconds since the network epoch, rounded by the
//! consensus process to the ledger's close-time resolution. Nodes that agree
//! on the parent ledger but not on the close time disagree at the protocol
//! level, so the value is compared exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since the network epoch at which a ledger closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CloseTime(u64);

impl CloseTime {
    /// The network epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Round down to a multiple of `resolution_secs`. A zero resolution
    /// leaves the value unchanged.
    pub fn rounded(&self, resolution_secs: u32) -> Self {
        if resolution_secs == 0 {
            return *self;
        }
        let res = u64::from(resolution_secs);
        Self(self.0 - self.0 % res)
    }
}

impl fmt::Display for CloseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
