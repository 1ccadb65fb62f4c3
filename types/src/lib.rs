//! Fundamental types for Concord.
//!
//! This crate defines the identifiers shared across every other crate in the
//! workspace: ledger and transaction hashes, sequence numbers and close times.

pub mod hash;
pub mod ledger_hash;
pub mod time;

pub use hash::{TxHash, TxSetHash};
pub use ledger_hash::LedgerHash;
pub use time::CloseTime;

/// Position of a ledger in the chain. Assigned monotonically, starting at 1.
pub type LedgerSeq = u32;
