use concord_types::{LedgerHash, LedgerSeq};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger serialization failed: {0}")]
    Serialization(String),

    #[error("loaded ledger {actual} where {expected} was requested")]
    HashMismatch {
        expected: LedgerHash,
        actual: LedgerHash,
    },

    #[error("loaded ledger for seq {actual} where seq {expected} was requested")]
    SeqMismatch {
        expected: LedgerSeq,
        actual: LedgerSeq,
    },

    #[error("storage error: {0}")]
    Storage(#[from] concord_store::StoreError),
}
