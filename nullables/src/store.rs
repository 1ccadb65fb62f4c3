//! Nullable store — thread-safe in-memory ledger storage for testing.

use concord_store::{LedgerBlobStore, StoreError};
use concord_types::{LedgerHash, LedgerSeq};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// An in-memory ledger blob store for testing.
///
/// Counts every read so tests can assert whether a lookup was served from
/// cache or went to "disk", and can be switched into a failing mode to
/// simulate an unavailable backend.
pub struct NullLedgerStore {
    blobs: Mutex<HashMap<LedgerHash, Vec<u8>>>,
    by_seq: Mutex<HashMap<LedgerSeq, LedgerHash>>,
    reads: AtomicUsize,
    failing: AtomicBool,
}

impl NullLedgerStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            by_seq: Mutex::new(HashMap::new()),
            reads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Number of `get_ledger` / `ledger_hash_at` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every subsequent read fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null store set to fail".into()));
        }
        Ok(())
    }
}

impl Default for NullLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerBlobStore for NullLedgerStore {
    fn put_ledger(
        &self,
        hash: &LedgerHash,
        seq: LedgerSeq,
        ledger_bytes: &[u8],
    ) -> Result<(), StoreError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(*hash, ledger_bytes.to_vec());
        self.by_seq.lock().unwrap().insert(seq, *hash);
        Ok(())
    }

    fn get_ledger(&self, hash: &LedgerHash) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available()?;
        Ok(self.blobs.lock().unwrap().get(hash).cloned())
    }

    fn ledger_hash_at(&self, seq: LedgerSeq) -> Result<Option<LedgerHash>, StoreError> {
        self.check_available()?;
        Ok(self.by_seq.lock().unwrap().get(&seq).copied())
    }
}
