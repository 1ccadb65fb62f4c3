//! Abstract storage traits for Concord.
//!
//! Every durable backend (on-disk database, remote archive, in-memory for
//! testing) implements these traits. The ledger crate depends only on them.

pub mod error;
pub mod ledger;

pub use error::StoreError;
pub use ledger::LedgerBlobStore;
