//! Ledger snapshots and the ledger store.
//!
//! A [`Ledger`] is an immutable, hash-identified snapshot at one sequence
//! number together with its transaction tree. Ledgers are built once through
//! [`LedgerBuilder`] (or decoded from storage) and then shared read-only as
//! `Arc<Ledger>`.
//!
//! The [`LedgerStore`] caches recently seen ledgers by hash, keeps a
//! sequence → hash index for validated ledgers, and falls back to a durable
//! [`LedgerLoader`] on cache misses.

pub mod error;
pub mod header;
pub mod ledger;
pub mod ledger_store;
pub mod loader;
pub mod meta;
pub mod tx_map;

pub use error::LedgerError;
pub use header::LedgerHeader;
pub use ledger::{Ledger, LedgerBuilder};
pub use ledger_store::LedgerStore;
pub use loader::{BlobLedgerLoader, LedgerLoader};
pub use meta::{AffectedNode, NodeChange, TxMeta, TxResult};
pub use tx_map::{TxEntry, TxMap};
