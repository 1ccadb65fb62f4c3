//! Consensus reconciliation: built vs. validated ledgers.
//!
//! For every sequence the node learns two facts, in either order: the hash
//! of the ledger it built through local consensus, and the hash the network
//! validated. When they disagree the divergence is diagnosed.
//!
//! ## Module overview
//!
//! - [`reconciliation`] — per-sequence record with write-once sides.
//! - [`tracker`] — [`ConsensusTracker`], the bounded set of records.
//! - [`diagnoser`] — classifies a mismatch and diffs transaction trees.
//! - [`divergence`] — report types.

pub mod diagnoser;
pub mod divergence;
pub mod reconciliation;
pub mod tracker;

pub use diagnoser::{diagnose, diff_meta};
pub use divergence::{
    ConsensusSetEvidence, DivergenceCause, DivergenceReport, FieldDiff, MetaDiff, Mismatch,
    TxDifference, TxSetDiff,
};
pub use reconciliation::{set_if_absent, Arrival, ReconciliationRecord, Sides};
pub use tracker::{
    ConsensusTracker, Reconciliation, CONSENSUS_CACHE_AGE, CONSENSUS_CACHE_CAPACITY,
};
