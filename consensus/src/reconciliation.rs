//! Per-sequence reconciliation record.
//!
//! Each side (built, validated) is written at most once. Whichever side
//! arrives second learns the settled value of the first under the record's
//! lock, so exactly one arrival per record gets to compare.

use concord_types::{LedgerHash, TxSetHash};
use std::sync::{Mutex, MutexGuard};

/// Write `value` into `slot` only if it is empty. Returns whether the write
/// happened.
pub fn set_if_absent<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}

/// What one record knows about its sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sides {
    pub built: Option<LedgerHash>,
    pub validated: Option<LedgerHash>,
    pub built_consensus_hash: Option<TxSetHash>,
    pub validated_consensus_hash: Option<TxSetHash>,
    /// Consensus round metadata supplied with the built ledger.
    pub consensus: Option<serde_json::Value>,
}

/// Result of recording one side.
#[derive(Clone, Debug, PartialEq)]
pub enum Arrival {
    /// This side was already recorded; nothing changed.
    Duplicate,
    /// This side is recorded and the other has not arrived yet.
    First,
    /// This side is recorded and the other was already settled.
    Second {
        other: LedgerHash,
        other_consensus_hash: Option<TxSetHash>,
        consensus: Option<serde_json::Value>,
    },
}

#[derive(Debug, Default)]
pub struct ReconciliationRecord {
    sides: Mutex<Sides>,
}

impl ReconciliationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Sides> {
        self.sides.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn settle_built(
        &self,
        hash: LedgerHash,
        consensus_hash: TxSetHash,
        consensus: serde_json::Value,
    ) -> Arrival {
        let mut sides = self.lock();
        if !set_if_absent(&mut sides.built, hash) {
            return Arrival::Duplicate;
        }
        sides.built_consensus_hash = Some(consensus_hash);
        sides.consensus = Some(consensus);
        match sides.validated {
            None => Arrival::First,
            Some(other) => Arrival::Second {
                other,
                other_consensus_hash: sides.validated_consensus_hash,
                consensus: sides.consensus.clone(),
            },
        }
    }

    pub fn settle_validated(
        &self,
        hash: LedgerHash,
        consensus_hash: Option<TxSetHash>,
    ) -> Arrival {
        let mut sides = self.lock();
        if !set_if_absent(&mut sides.validated, hash) {
            return Arrival::Duplicate;
        }
        sides.validated_consensus_hash = consensus_hash;
        match sides.built {
            None => Arrival::First,
            Some(other) => Arrival::Second {
                other,
                other_consensus_hash: sides.built_consensus_hash,
                consensus: sides.consensus.clone(),
            },
        }
    }

    pub fn snapshot(&self) -> Sides {
        self.lock().clone()
    }
}
