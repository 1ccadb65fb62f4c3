//! Hash-keyed ledger cache with a sequence index.
//!
//! Two lock domains: the cache's internal mutex and `by_seq`. A cache
//! operation always completes before `by_seq` is locked, and the loader is
//! only called with neither held.

use concord_types::{LedgerHash, LedgerSeq};
use concord_utils::{CacheInfo, Clock, ExpiringCache};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::{Ledger, LedgerError, LedgerLoader};

pub struct LedgerStore {
    cache: ExpiringCache<LedgerHash, Ledger>,
    /// Validated ledgers by sequence. Unbounded; never pruned with the cache.
    by_seq: Mutex<HashMap<LedgerSeq, LedgerHash>>,
    loader: Arc<dyn LedgerLoader>,
}

impl LedgerStore {
    pub fn new(
        capacity: usize,
        max_age: Duration,
        clock: Arc<dyn Clock>,
        loader: Arc<dyn LedgerLoader>,
    ) -> Self {
        Self {
            cache: ExpiringCache::new("LedgerCache", capacity, max_age, clock),
            by_seq: Mutex::new(HashMap::new()),
            loader,
        }
    }

    fn index(&self) -> MutexGuard<'_, HashMap<LedgerSeq, LedgerHash>> {
        self.by_seq.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cache `ledger`, and index it by sequence if `validated`. Returns
    /// whether a cached ledger with the same hash was replaced.
    ///
    /// # Panics
    ///
    /// If the ledger's transaction-tree hash is zero.
    pub fn insert(&self, ledger: Arc<Ledger>, validated: bool) -> bool {
        assert!(
            !ledger.tx_root().is_zero(),
            "ledger {} (seq {}) inserted with a zero transaction-tree hash",
            ledger.hash(),
            ledger.seq()
        );
        let seq = ledger.seq();
        let hash = ledger.hash();
        let replaced = self.cache.insert_or_assign(hash, ledger);
        if validated {
            self.index().insert(seq, hash);
        }
        replaced
    }

    /// Indexed hash for `seq`. Never consults the loader.
    pub fn hash_by_seq(&self, seq: LedgerSeq) -> Option<LedgerHash> {
        self.index().get(&seq).copied()
    }

    pub fn fetch_by_seq(&self, seq: LedgerSeq) -> Option<Arc<Ledger>> {
        if let Some(hash) = self.hash_by_seq(seq) {
            return self.fetch_by_hash(&hash);
        }

        let ledger = self.settle(self.loader.load_by_index(seq))?;
        if ledger.seq() != seq {
            tracing::error!(
                requested = seq,
                loaded = ledger.seq(),
                hash = %ledger.hash(),
                "loader returned a ledger for the wrong sequence"
            );
            return None;
        }

        let ledger = self.cache.fetch_or_insert(ledger.hash(), ledger);
        self.index().insert(seq, ledger.hash());
        Some(ledger)
    }

    pub fn fetch_by_hash(&self, hash: &LedgerHash) -> Option<Arc<Ledger>> {
        if let Some(ledger) = self.cache.fetch(hash) {
            return Some(ledger);
        }

        let ledger = self.settle(self.loader.load_by_hash(hash))?;
        if ledger.hash() != *hash {
            tracing::error!(
                requested = %hash,
                loaded = %ledger.hash(),
                "loader returned the wrong ledger"
            );
            return None;
        }
        Some(self.cache.fetch_or_insert(*hash, ledger))
    }

    fn settle(
        &self,
        loaded: Result<Option<Arc<Ledger>>, LedgerError>,
    ) -> Option<Arc<Ledger>> {
        match loaded {
            Ok(ledger) => ledger,
            Err(e @ (LedgerError::HashMismatch { .. } | LedgerError::SeqMismatch { .. })) => {
                tracing::error!(error = %e, "discarding corrupt ledger from loader");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "ledger load failed");
                None
            }
        }
    }

    /// Point `seq` at `hash` if it is indexed to something else. Returns
    /// `false` when a correction was made, `true` otherwise (including when
    /// `seq` is not indexed at all).
    pub fn fix_index(&self, seq: LedgerSeq, hash: LedgerHash) -> bool {
        let mut index = self.index();
        match index.get_mut(&seq) {
            Some(current) if *current != hash => {
                tracing::warn!(seq, old = %current, new = %hash, "correcting sequence index");
                *current = hash;
                false
            }
            _ => true,
        }
    }

    /// Drop every cached ledger with a sequence below `seq`. The sequence
    /// index is left alone.
    pub fn prune_before(&self, seq: LedgerSeq) -> usize {
        self.cache.erase_if(|ledger| ledger.seq() < seq)
    }

    /// Purge age-expired ledgers from the cache.
    pub fn sweep(&self) -> usize {
        self.cache.sweep()
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.cache.info()
    }

    pub fn index_len(&self) -> usize {
        self.index().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlobLedgerLoader, LedgerBuilder, LedgerHeader, TxMap};
    use concord_nullables::{NullClock, NullLedgerStore};
    use concord_types::TxHash;

    struct Fixture {
        clock: Arc<NullClock>,
        disk: Arc<NullLedgerStore>,
        loader: Arc<BlobLedgerLoader<NullLedgerStore>>,
        store: LedgerStore,
    }

    fn fixture(capacity: usize, max_age_secs: u64) -> Fixture {
        let clock = Arc::new(NullClock::new());
        let disk = Arc::new(NullLedgerStore::new());
        let loader = Arc::new(BlobLedgerLoader::new(Arc::clone(&disk)));
        let store = LedgerStore::new(
            capacity,
            Duration::from_secs(max_age_secs),
            clock.clone(),
            loader.clone(),
        );
        Fixture {
            clock,
            disk,
            loader,
            store,
        }
    }

    fn ledger(seq: LedgerSeq, salt: u8) -> Arc<Ledger> {
        Arc::new(
            LedgerBuilder::new(seq, LedgerHash::new([salt; 32]))
                .transaction(TxHash::new([salt; 32]), vec![salt, 1, 2], None)
                .build(),
        )
    }

    #[test]
    fn validated_insert_is_reachable_by_seq() {
        let f = fixture(16, 60);
        let l = ledger(10, 1);
        assert!(!f.store.insert(l.clone(), true));
        assert_eq!(f.store.hash_by_seq(10), Some(l.hash()));
        assert_eq!(f.store.fetch_by_seq(10).unwrap().hash(), l.hash());
        assert_eq!(f.disk.reads(), 0);
    }

    #[test]
    fn unvalidated_insert_is_not_indexed() {
        let f = fixture(16, 60);
        let l = ledger(10, 1);
        f.store.insert(l.clone(), false);
        assert_eq!(f.store.hash_by_seq(10), None);
        assert_eq!(f.store.fetch_by_hash(&l.hash()).unwrap().hash(), l.hash());
    }

    #[test]
    fn reinsert_reports_replacement() {
        let f = fixture(16, 60);
        let l = ledger(3, 1);
        assert!(!f.store.insert(l.clone(), false));
        assert!(f.store.insert(l, false));
    }

    #[test]
    fn index_miss_loads_and_indexes() {
        let f = fixture(16, 60);
        let l = ledger(20, 2);
        f.loader.save(&l).unwrap();

        let fetched = f.store.fetch_by_seq(20).unwrap();
        assert_eq!(fetched.hash(), l.hash());
        assert_eq!(f.store.hash_by_seq(20), Some(l.hash()));

        let reads = f.disk.reads();
        f.store.fetch_by_hash(&l.hash()).unwrap();
        assert_eq!(f.disk.reads(), reads, "second lookup served from cache");
    }

    #[test]
    fn hash_miss_loads_from_disk() {
        let f = fixture(16, 60);
        let l = ledger(5, 3);
        f.loader.save(&l).unwrap();
        assert_eq!(f.store.fetch_by_hash(&l.hash()).unwrap().hash(), l.hash());
        assert_eq!(f.store.cache_info().size, 1);
        assert_eq!(f.store.hash_by_seq(5), None);
    }

    #[test]
    fn loader_failure_is_empty_without_side_effects() {
        let f = fixture(16, 60);
        let l = ledger(7, 4);
        f.loader.save(&l).unwrap();
        f.disk.set_failing(true);

        assert!(f.store.fetch_by_seq(7).is_none());
        assert!(f.store.fetch_by_hash(&l.hash()).is_none());
        assert_eq!(f.store.index_len(), 0);
        assert_eq!(f.store.cache_info().size, 0);
    }

    #[test]
    fn expired_ledger_is_reloaded() {
        let f = fixture(16, 30);
        let l = ledger(8, 5);
        f.loader.save(&l).unwrap();
        f.store.insert(l.clone(), true);

        f.clock.advance_secs(31);
        let before = f.disk.reads();
        assert_eq!(f.store.fetch_by_seq(8).unwrap().hash(), l.hash());
        assert_eq!(f.disk.reads(), before + 1);
    }

    #[test]
    fn fix_index_corrects_only_differing_entries() {
        let f = fixture(16, 60);
        let a = ledger(9, 6);
        let b = ledger(9, 7);

        assert!(f.store.fix_index(9, a.hash()), "absent entry needs no fix");
        assert_eq!(f.store.hash_by_seq(9), None);

        f.store.insert(a.clone(), true);
        assert!(f.store.fix_index(9, a.hash()));
        assert!(!f.store.fix_index(9, b.hash()));
        assert_eq!(f.store.hash_by_seq(9), Some(b.hash()));
    }

    #[test]
    fn prune_before_drops_older_ledgers_only() {
        let f = fixture(16, 60);
        for seq in 1..=5 {
            f.store.insert(ledger(seq, seq as u8), true);
        }
        assert_eq!(f.store.prune_before(3), 2);
        assert_eq!(f.store.cache_info().size, 3);
        assert_eq!(f.store.index_len(), 5);
    }

    #[test]
    fn sweep_purges_expired_ledgers() {
        let f = fixture(16, 30);
        f.store.insert(ledger(1, 1), false);
        f.clock.advance_secs(20);
        f.store.insert(ledger(2, 2), false);
        f.clock.advance_secs(15);
        assert_eq!(f.store.sweep(), 1);
        assert_eq!(f.store.cache_info().size, 1);
    }

    struct WrongSeqLoader(Arc<Ledger>);

    impl LedgerLoader for WrongSeqLoader {
        fn load_by_hash(&self, _: &LedgerHash) -> Result<Option<Arc<Ledger>>, LedgerError> {
            Ok(Some(self.0.clone()))
        }

        fn load_by_index(&self, _: LedgerSeq) -> Result<Option<Arc<Ledger>>, LedgerError> {
            Ok(Some(self.0.clone()))
        }
    }

    #[test]
    fn mismatched_loader_results_are_discarded() {
        let l = ledger(4, 9);
        let store = LedgerStore::new(
            16,
            Duration::from_secs(60),
            Arc::new(NullClock::new()),
            Arc::new(WrongSeqLoader(l)),
        );
        assert!(store.fetch_by_seq(5).is_none());
        assert!(store.fetch_by_hash(&LedgerHash::new([1; 32])).is_none());
        assert_eq!(store.index_len(), 0);
        assert_eq!(store.cache_info().size, 0);
    }

    #[test]
    #[should_panic(expected = "zero transaction-tree hash")]
    fn zero_tx_root_is_rejected() {
        let f = fixture(16, 60);
        let header = LedgerHeader {
            seq: 1,
            hash: LedgerHash::new([1; 32]),
            parent_hash: LedgerHash::ZERO,
            close_time: Default::default(),
            close_time_resolution: 10,
            tx_root: LedgerHash::ZERO,
            state_root: LedgerHash::ZERO,
        };
        f.store
            .insert(Arc::new(Ledger::from_parts(header, TxMap::new())), false);
    }
}
