//! Divergence report types.

use concord_ledger::{AffectedNode, TxResult};
use concord_types::{CloseTime, LedgerHash, LedgerSeq, TxHash, TxSetHash};
use serde::Serialize;
use std::fmt;

/// The two conflicting hashes recorded for one sequence, with the consensus
/// transaction-set hashes that came with them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub seq: LedgerSeq,
    pub built: LedgerHash,
    pub valid: LedgerHash,
    pub built_consensus_hash: Option<TxSetHash>,
    pub valid_consensus_hash: Option<TxSetHash>,
}

/// One diagnosed mismatch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DivergenceReport {
    pub mismatch: Mismatch,
    pub cause: DivergenceCause,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DivergenceCause {
    /// One or both ledgers could not be retrieved.
    Unanalyzable {
        built_available: bool,
        valid_available: bool,
    },
    /// The ledgers were built on different parents. Usually sync lag.
    PriorLedger {
        built_parent: LedgerHash,
        valid_parent: LedgerHash,
    },
    /// Same parent, different close time. Protocol-level (Byzantine)
    /// disagreement.
    CloseTime { built: CloseTime, valid: CloseTime },
    /// Same parent and close time; the transaction trees were compared.
    Transactions(TxSetDiff),
}

/// Whether the two sides agreed on the consensus transaction set. Only
/// produced when both sides supplied one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ConsensusSetEvidence {
    Same(TxSetHash),
    Different { built: TxSetHash, valid: TxSetHash },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TxSetDiff {
    pub consensus_set: Option<ConsensusSetEvidence>,
    pub built_count: usize,
    pub valid_count: usize,
    /// Both trees hold exactly the same leaves.
    pub same_transactions: bool,
    /// Per-transaction differences in ascending id order.
    pub differences: Vec<TxDifference>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TxDifference {
    /// Only the built ledger has this transaction.
    MissingFromValid(TxHash),
    /// Only the validated ledger has this transaction.
    MissingFromBuilt(TxHash),
    /// Both have it, with different content.
    Metadata { id: TxHash, diff: MetaDiff },
}

impl TxDifference {
    pub fn id(&self) -> TxHash {
        match self {
            Self::MissingFromValid(id) | Self::MissingFromBuilt(id) => *id,
            Self::Metadata { id, .. } => *id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum MetaDiff {
    /// Content differs but result, index and affected nodes all agree.
    NoApparentDifference,
    Fields(FieldDiff),
    /// The validated side has metadata, the built side none.
    BuiltHasNone,
    /// The built side has metadata, the validated side none.
    ValidHasNone,
}

/// Which metadata fields differ. A field is `Some((built, valid))` only if
/// it differs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDiff {
    pub result: Option<(TxResult, TxResult)>,
    pub index: Option<(u32, u32)>,
    pub nodes: Option<(Vec<AffectedNode>, Vec<AffectedNode>)>,
}

impl FieldDiff {
    pub fn is_empty(&self) -> bool {
        self.result.is_none() && self.index.is_none() && self.nodes.is_none()
    }
}

impl fmt::Display for FieldDiff {
    /// "result", "index and nodes", "result, index and nodes", ...
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            self.result.is_some().then_some("result"),
            self.index.is_some().then_some("index"),
            self.nodes.is_some().then_some("nodes"),
        ]
        .into_iter()
        .flatten()
        .collect();
        match names.as_slice() {
            [] => Ok(()),
            [one] => f.write_str(one),
            [init @ .., last] => write!(f, "{} and {}", init.join(", "), last),
        }
    }
}

impl fmt::Display for DivergenceCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unanalyzable { .. } => f.write_str("cannot be analyzed"),
            Self::PriorLedger { .. } => f.write_str("prior ledger"),
            Self::CloseTime { .. } => f.write_str("close time"),
            Self::Transactions(diff) => write!(
                f,
                "{} built and {} valid transactions, {} differing",
                diff.built_count,
                diff.valid_count,
                diff.differences.len()
            ),
        }
    }
}
