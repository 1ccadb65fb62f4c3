//! Divergence diagnosis.
//!
//! Given two ledgers recorded for the same sequence, work out why they
//! differ. Checks run from coarsest to finest and stop at the first that
//! explains the disagreement: availability, parent, close time, then a
//! leaf-by-leaf walk of both transaction trees.

use concord_ledger::{Ledger, LedgerStore, TxEntry, TxMeta};
use concord_types::TxHash;
use std::cmp::Ordering;

use crate::divergence::{
    ConsensusSetEvidence, DivergenceCause, DivergenceReport, FieldDiff, MetaDiff, Mismatch,
    TxDifference, TxSetDiff,
};

/// Diagnose `mismatch`, reading both ledgers through `ledgers`.
///
/// Results are logged as well as returned. `consensus` is the metadata of
/// the local consensus round, included in the debug dump.
///
/// # Panics
///
/// If the two hashes are equal, or if both ledgers are available and their
/// sequences differ.
pub fn diagnose(
    ledgers: &LedgerStore,
    mismatch: Mismatch,
    consensus: Option<&serde_json::Value>,
) -> DivergenceReport {
    assert_ne!(
        mismatch.built, mismatch.valid,
        "diagnosing a mismatch between identical hashes"
    );

    let built = ledgers.fetch_by_hash(&mismatch.built);
    let valid = ledgers.fetch_by_hash(&mismatch.valid);
    let (Some(built), Some(valid)) = (built.as_deref(), valid.as_deref()) else {
        tracing::error!(
            seq = mismatch.seq,
            built = %mismatch.built,
            built_available = built.is_some(),
            valid = %mismatch.valid,
            valid_available = valid.is_some(),
            "MISMATCH cannot be analyzed"
        );
        let cause = DivergenceCause::Unanalyzable {
            built_available: built.is_some(),
            valid_available: valid.is_some(),
        };
        return DivergenceReport { mismatch, cause };
    };

    assert_eq!(
        built.seq(),
        valid.seq(),
        "diagnosing ledgers with different sequences"
    );

    tracing::debug!(
        seq = built.seq(),
        built = %built.to_json(),
        valid = %valid.to_json(),
        consensus = %consensus.cloned().unwrap_or_default(),
        "mismatch"
    );

    let cause = classify(built, valid, &mismatch);
    DivergenceReport { mismatch, cause }
}

fn classify(built: &Ledger, valid: &Ledger, mismatch: &Mismatch) -> DivergenceCause {
    if built.parent_hash() != valid.parent_hash() {
        tracing::error!(
            seq = built.seq(),
            built_parent = %built.parent_hash(),
            valid_parent = %valid.parent_hash(),
            "MISMATCH on prior ledger"
        );
        return DivergenceCause::PriorLedger {
            built_parent: built.parent_hash(),
            valid_parent: valid.parent_hash(),
        };
    }

    if built.close_time() != valid.close_time() {
        tracing::error!(
            seq = built.seq(),
            built_close = %built.close_time(),
            valid_close = %valid.close_time(),
            "MISMATCH on close time"
        );
        return DivergenceCause::CloseTime {
            built: built.close_time(),
            valid: valid.close_time(),
        };
    }

    let consensus_set = match (mismatch.built_consensus_hash, mismatch.valid_consensus_hash) {
        (Some(b), Some(v)) if b == v => {
            tracing::error!(consensus_set = %b, "MISMATCH with same consensus transaction set");
            Some(ConsensusSetEvidence::Same(b))
        }
        (Some(b), Some(v)) => {
            tracing::error!(built = %b, validated = %v, "MISMATCH on consensus transaction set");
            Some(ConsensusSetEvidence::Different { built: b, valid: v })
        }
        _ => None,
    };

    DivergenceCause::Transactions(diff_transactions(built, valid, consensus_set))
}

fn diff_transactions(
    built: &Ledger,
    valid: &Ledger,
    consensus_set: Option<ConsensusSetEvidence>,
) -> TxSetDiff {
    let built_count = built.txs().len();
    let valid_count = valid.txs().len();
    let same_transactions = built.txs() == valid.txs();

    if same_transactions {
        tracing::error!(count = built_count, "MISMATCH with same transactions");
    } else {
        tracing::error!(built_count, valid_count, "MISMATCH in transactions");
    }
    tracing::error!(built = %built.to_json(), valid = %valid.to_json(), "mismatched ledgers");

    let mut differences = Vec::new();
    let mut b = built.txs().iter().peekable();
    let mut v = valid.txs().iter().peekable();
    loop {
        let order = match (b.peek(), v.peek()) {
            (Some((bk, _)), Some((vk, _))) => bk.cmp(vk),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match order {
            Ordering::Less => {
                if let Some((id, entry)) = b.next() {
                    log_missing(id, entry, "valid");
                    differences.push(TxDifference::MissingFromValid(*id));
                }
            }
            Ordering::Greater => {
                if let Some((id, entry)) = v.next() {
                    log_missing(id, entry, "built");
                    differences.push(TxDifference::MissingFromBuilt(*id));
                }
            }
            Ordering::Equal => {
                if let (Some((id, be)), Some((_, ve))) = (b.next(), v.next()) {
                    if be != ve {
                        let diff = diff_meta(id, be.meta.as_ref(), ve.meta.as_ref());
                        differences.push(TxDifference::Metadata { id: *id, diff });
                    }
                }
            }
        }
    }

    TxSetDiff {
        consensus_set,
        built_count,
        valid_count,
        same_transactions,
        differences,
    }
}

fn log_missing(id: &TxHash, entry: &TxEntry, side: &str) {
    match &entry.meta {
        Some(meta) => tracing::debug!(
            tx = %id,
            meta = %meta.to_json(),
            "MISMATCH on TX: {side} is missing this transaction"
        ),
        None => tracing::debug!(tx = %id, "MISMATCH on TX: {side} is missing this transaction"),
    }
}

/// Compare the metadata of one transaction present on both sides.
pub fn diff_meta(id: &TxHash, built: Option<&TxMeta>, valid: Option<&TxMeta>) -> MetaDiff {
    let (built, valid) = match (built, valid) {
        (Some(b), Some(v)) => (b, v),
        (None, Some(v)) => {
            tracing::error!(
                tx = %id,
                valid = %v.to_json(),
                "MISMATCH on TX: metadata difference (built has none)"
            );
            return MetaDiff::BuiltHasNone;
        }
        (Some(b), None) => {
            tracing::error!(
                tx = %id,
                built = %b.to_json(),
                "MISMATCH on TX: metadata difference (valid has none)"
            );
            return MetaDiff::ValidHasNone;
        }
        (None, None) => {
            tracing::error!(tx = %id, "MISMATCH on TX: no apparent mismatches detected");
            return MetaDiff::NoApparentDifference;
        }
    };

    let fields = FieldDiff {
        result: (built.result != valid.result).then_some((built.result, valid.result)),
        index: (built.index != valid.index).then_some((built.index, valid.index)),
        nodes: (built.affected_nodes != valid.affected_nodes)
            .then(|| (built.affected_nodes.clone(), valid.affected_nodes.clone())),
    };

    if fields.is_empty() {
        tracing::error!(tx = %id, "MISMATCH on TX: no apparent mismatches detected");
        return MetaDiff::NoApparentDifference;
    }

    if fields.nodes.is_some() {
        tracing::debug!(
            tx = %id,
            built = %built.to_json(),
            valid = %valid.to_json(),
            "MISMATCH on TX: different {fields}"
        );
    } else {
        tracing::debug!(
            tx = %id,
            built_result = %built.result,
            valid_result = %valid.result,
            built_index = built.index,
            valid_index = valid.index,
            "MISMATCH on TX: different {fields}"
        );
    }
    MetaDiff::Fields(fields)
}
