//! Ledger blob storage trait.

use crate::StoreError;
use concord_types::{LedgerHash, LedgerSeq};

/// Durable storage for serialized ledgers.
///
/// "Not found" is `Ok(None)`; `Err` is reserved for the backend itself
/// failing (I/O, network, corruption).
pub trait LedgerBlobStore: Send + Sync {
    /// Store a serialized ledger keyed by its hash and record it as the
    /// ledger at `seq`.
    fn put_ledger(
        &self,
        hash: &LedgerHash,
        seq: LedgerSeq,
        ledger_bytes: &[u8],
    ) -> Result<(), StoreError>;

    /// Retrieve a serialized ledger by hash.
    fn get_ledger(&self, hash: &LedgerHash) -> Result<Option<Vec<u8>>, StoreError>;

    /// Hash of the ledger stored for `seq`, if any.
    fn ledger_hash_at(&self, seq: LedgerSeq) -> Result<Option<LedgerHash>, StoreError>;
}
