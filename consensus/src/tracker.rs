//! Built/validated reconciliation across sequences.

use concord_ledger::{Ledger, LedgerStore};
use concord_types::{LedgerSeq, TxSetHash};
use concord_utils::{CacheInfo, Clock, ExpiringCache};
use prometheus::IntCounter;
use std::sync::Arc;
use std::time::Duration;

use crate::diagnoser::diagnose;
use crate::divergence::{DivergenceReport, Mismatch};
use crate::reconciliation::{Arrival, ReconciliationRecord};

/// Records kept at once.
pub const CONSENSUS_CACHE_CAPACITY: usize = 64;
/// How long a record waits for its other side.
pub const CONSENSUS_CACHE_AGE: Duration = Duration::from_secs(5 * 60);

/// Outcome of recording one side of a sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum Reconciliation {
    /// First side for this sequence; nothing to compare yet.
    Pending,
    /// Both sides agree.
    Matched,
    /// The sides disagree; the diagnosis is attached.
    Diverged(Box<DivergenceReport>),
    /// This side was already recorded for the sequence. Ignored.
    AlreadyRecorded,
}

/// Cross-checks the ledger built locally against the one the network
/// validated, per sequence.
///
/// Records live in a bounded, age-limited cache. If a record is evicted
/// before its second side arrives, that sequence is never compared.
pub struct ConsensusTracker {
    records: ExpiringCache<LedgerSeq, ReconciliationRecord>,
    ledgers: Arc<LedgerStore>,
    mismatches: IntCounter,
}

impl ConsensusTracker {
    pub fn new(ledgers: Arc<LedgerStore>, clock: Arc<dyn Clock>, mismatches: IntCounter) -> Self {
        Self {
            records: ExpiringCache::new(
                "ConsensusValidated",
                CONSENSUS_CACHE_CAPACITY,
                CONSENSUS_CACHE_AGE,
                clock,
            ),
            ledgers,
            mismatches,
        }
    }

    fn record(&self, seq: LedgerSeq) -> Arc<ReconciliationRecord> {
        self.records
            .fetch_or_insert(seq, Arc::new(ReconciliationRecord::new()))
    }

    /// Record the ledger this node built for its sequence.
    ///
    /// # Panics
    ///
    /// If the ledger hash is zero.
    pub fn record_built(
        &self,
        ledger: &Ledger,
        consensus_hash: TxSetHash,
        consensus: serde_json::Value,
    ) -> Reconciliation {
        let (seq, hash) = (ledger.seq(), ledger.hash());
        assert!(!hash.is_zero(), "built ledger at seq {seq} has a zero hash");

        match self.record(seq).settle_built(hash, consensus_hash, consensus) {
            Arrival::Duplicate => Reconciliation::AlreadyRecorded,
            Arrival::First => Reconciliation::Pending,
            Arrival::Second { other, .. } if other == hash => {
                tracing::debug!(seq, "MATCH late");
                Reconciliation::Matched
            }
            Arrival::Second {
                other,
                other_consensus_hash,
                consensus,
            } => {
                tracing::error!(seq, validated = %other, then = %hash, "MISMATCH");
                let mismatch = Mismatch {
                    seq,
                    built: hash,
                    valid: other,
                    built_consensus_hash: Some(consensus_hash),
                    valid_consensus_hash: other_consensus_hash,
                };
                self.diverged(mismatch, consensus)
            }
        }
    }

    /// Record the ledger the network validated for its sequence.
    ///
    /// # Panics
    ///
    /// If the ledger hash is zero.
    pub fn record_validated(
        &self,
        ledger: &Ledger,
        consensus_hash: Option<TxSetHash>,
    ) -> Reconciliation {
        let (seq, hash) = (ledger.seq(), ledger.hash());
        assert!(!hash.is_zero(), "validated ledger at seq {seq} has a zero hash");

        match self.record(seq).settle_validated(hash, consensus_hash) {
            Arrival::Duplicate => Reconciliation::AlreadyRecorded,
            Arrival::First => Reconciliation::Pending,
            Arrival::Second { other, .. } if other == hash => {
                tracing::trace!(seq, "MATCH on validated ledger");
                Reconciliation::Matched
            }
            Arrival::Second {
                other,
                other_consensus_hash,
                consensus,
            } => {
                tracing::error!(seq, built = %other, validated = %hash, "MISMATCH on validated ledger");
                let mismatch = Mismatch {
                    seq,
                    built: other,
                    valid: hash,
                    built_consensus_hash: other_consensus_hash,
                    valid_consensus_hash: consensus_hash,
                };
                self.diverged(mismatch, consensus)
            }
        }
    }

    fn diverged(&self, mismatch: Mismatch, consensus: Option<serde_json::Value>) -> Reconciliation {
        self.mismatches.inc();
        let report = diagnose(&self.ledgers, mismatch, consensus.as_ref());
        Reconciliation::Diverged(Box::new(report))
    }

    /// Total mismatches diagnosed through this tracker's counter.
    pub fn mismatch_count(&self) -> u64 {
        self.mismatches.get()
    }

    pub fn sweep(&self) -> usize {
        self.records.sweep()
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.records.info()
    }
}
