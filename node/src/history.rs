//! Ledger history: the node-facing surface over the ledger store and the
//! built/validated tracker.

use concord_consensus::{ConsensusTracker, Reconciliation};
use concord_ledger::{Ledger, LedgerLoader, LedgerStore};
use concord_types::{LedgerHash, LedgerSeq, TxSetHash};
use concord_utils::{CacheInfo, Clock};
use prometheus::IntCounter;
use serde::Serialize;
use std::sync::Arc;

use crate::config::NodeConfig;

/// Snapshot of both caches and the sequence index, for admin endpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryInfo {
    pub ledger_cache: CacheInfo,
    pub consensus_validated: CacheInfo,
    pub ledgers_by_index: usize,
}

pub struct LedgerHistory {
    ledgers: Arc<LedgerStore>,
    tracker: ConsensusTracker,
}

impl LedgerHistory {
    pub fn new(
        config: &NodeConfig,
        clock: Arc<dyn Clock>,
        loader: Arc<dyn LedgerLoader>,
        mismatches: IntCounter,
    ) -> Self {
        let ledgers = Arc::new(LedgerStore::new(
            config.ledger_cache_capacity(),
            config.ledger_cache_age(),
            Arc::clone(&clock),
            loader,
        ));
        let tracker = ConsensusTracker::new(Arc::clone(&ledgers), clock, mismatches);
        Self { ledgers, tracker }
    }

    /// Track a ledger. Returns whether it was already cached.
    pub fn insert(&self, ledger: Arc<Ledger>, validated: bool) -> bool {
        self.ledgers.insert(ledger, validated)
    }

    pub fn get_ledger_hash(&self, seq: LedgerSeq) -> Option<LedgerHash> {
        self.ledgers.hash_by_seq(seq)
    }

    pub fn get_ledger_by_seq(&self, seq: LedgerSeq) -> Option<Arc<Ledger>> {
        self.ledgers.fetch_by_seq(seq)
    }

    pub fn get_ledger_by_hash(&self, hash: &LedgerHash) -> Option<Arc<Ledger>> {
        self.ledgers.fetch_by_hash(hash)
    }

    /// Repair the index entry for `seq`. Returns `false` if it had to change.
    pub fn fix_index(&self, seq: LedgerSeq, hash: LedgerHash) -> bool {
        self.ledgers.fix_index(seq, hash)
    }

    pub fn clear_ledger_cache_prior(&self, seq: LedgerSeq) -> usize {
        self.ledgers.prune_before(seq)
    }

    /// Report the ledger this node built through consensus.
    pub fn built_ledger(
        &self,
        ledger: &Ledger,
        consensus_hash: TxSetHash,
        consensus: serde_json::Value,
    ) -> Reconciliation {
        self.tracker.record_built(ledger, consensus_hash, consensus)
    }

    /// Report the ledger the network validated.
    pub fn validated_ledger(
        &self,
        ledger: &Ledger,
        consensus_hash: Option<TxSetHash>,
    ) -> Reconciliation {
        self.tracker.record_validated(ledger, consensus_hash)
    }

    pub fn mismatch_count(&self) -> u64 {
        self.tracker.mismatch_count()
    }

    pub fn info(&self) -> HistoryInfo {
        HistoryInfo {
            ledger_cache: self.ledgers.cache_info(),
            consensus_validated: self.tracker.cache_info(),
            ledgers_by_index: self.ledgers.index_len(),
        }
    }

    /// Drop age-expired entries from both caches.
    pub fn sweep(&self) -> usize {
        self.ledgers.sweep() + self.tracker.sweep()
    }
}
