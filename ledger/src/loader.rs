//! Durable ledger loading.
//!
//! The [`LedgerStore`](crate::LedgerStore) consults a [`LedgerLoader`] when a
//! ledger is not in memory. A loader reports "not found" as `Ok(None)`; an
//! `Err` means the backing storage failed or returned something that does not
//! match the request.

use concord_store::LedgerBlobStore;
use concord_types::{LedgerHash, LedgerSeq};
use std::sync::Arc;

use crate::{Ledger, LedgerError};

/// Source of ledgers that are not held in memory.
pub trait LedgerLoader: Send + Sync {
    fn load_by_hash(&self, hash: &LedgerHash) -> Result<Option<Arc<Ledger>>, LedgerError>;

    fn load_by_index(&self, seq: LedgerSeq) -> Result<Option<Arc<Ledger>>, LedgerError>;
}

/// Loads ledgers serialized with [`Ledger::to_bytes`] from a blob store.
pub struct BlobLedgerLoader<S> {
    store: Arc<S>,
}

impl<S: LedgerBlobStore> BlobLedgerLoader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Serialize `ledger` into the underlying store.
    pub fn save(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        let bytes = ledger.to_bytes()?;
        self.store.put_ledger(&ledger.hash(), ledger.seq(), &bytes)?;
        Ok(())
    }
}

impl<S: LedgerBlobStore> LedgerLoader for BlobLedgerLoader<S> {
    fn load_by_hash(&self, hash: &LedgerHash) -> Result<Option<Arc<Ledger>>, LedgerError> {
        let Some(bytes) = self.store.get_ledger(hash)? else {
            return Ok(None);
        };
        let ledger = Ledger::from_bytes(&bytes)?;
        if ledger.hash() != *hash {
            return Err(LedgerError::HashMismatch {
                expected: *hash,
                actual: ledger.hash(),
            });
        }
        Ok(Some(Arc::new(ledger)))
    }

    fn load_by_index(&self, seq: LedgerSeq) -> Result<Option<Arc<Ledger>>, LedgerError> {
        let Some(hash) = self.store.ledger_hash_at(seq)? else {
            return Ok(None);
        };
        let Some(ledger) = self.load_by_hash(&hash)? else {
            return Ok(None);
        };
        if ledger.seq() != seq {
            return Err(LedgerError::SeqMismatch {
                expected: seq,
                actual: ledger.seq(),
            });
        }
        Ok(Some(ledger))
    }
}
