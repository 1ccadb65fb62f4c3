//! Ledger header: the fields that identify a ledger and link it to its
//! predecessor.

use concord_types::{CloseTime, LedgerHash, LedgerSeq};
use serde::{Deserialize, Serialize};

/// Identifying fields of a ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    /// Position of this ledger in the chain.
    pub seq: LedgerSeq,
    /// Hash of this ledger, covering every other header field.
    pub hash: LedgerHash,
    /// Hash of the ledger this one was built on.
    pub parent_hash: LedgerHash,
    /// Consensus close time, rounded to `close_time_resolution`.
    pub close_time: CloseTime,
    /// Granularity, in seconds, the close time was rounded to.
    pub close_time_resolution: u32,
    /// Root hash of the transaction tree.
    pub tx_root: LedgerHash,
    /// Root hash of the account-state tree.
    pub state_root: LedgerHash,
}
