//! Immutable ledger snapshot and its builder.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use concord_types::{CloseTime, LedgerHash, LedgerSeq, TxHash};
use serde::{Deserialize, Serialize};

use crate::header::LedgerHeader;
use crate::meta::TxMeta;
use crate::tx_map::{TxEntry, TxMap};
use crate::LedgerError;

/// An immutable ledger: header plus transaction tree.
///
/// There is no mutation API. Holders share it as `Arc<Ledger>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    header: LedgerHeader,
    txs: TxMap,
}

impl Ledger {
    /// Assemble a ledger from an already-computed header, e.g. one read back
    /// from storage. The header is trusted as-is.
    pub fn from_parts(header: LedgerHeader, txs: TxMap) -> Self {
        Self { header, txs }
    }

    pub fn header(&self) -> &LedgerHeader {
        &self.header
    }

    pub fn seq(&self) -> LedgerSeq {
        self.header.seq
    }

    pub fn hash(&self) -> LedgerHash {
        self.header.hash
    }

    pub fn parent_hash(&self) -> LedgerHash {
        self.header.parent_hash
    }

    pub fn close_time(&self) -> CloseTime {
        self.header.close_time
    }

    pub fn tx_root(&self) -> LedgerHash {
        self.header.tx_root
    }

    pub fn txs(&self) -> &TxMap {
        &self.txs
    }

    /// Metadata recorded for `id`, if the transaction is present and has any.
    pub fn tx_meta(&self, id: &TxHash) -> Option<&TxMeta> {
        self.txs.get(id).and_then(|e| e.meta.as_ref())
    }

    /// Header-level JSON view for diagnostic dumps.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "seq": self.header.seq,
            "hash": self.header.hash.to_string(),
            "parent_hash": self.header.parent_hash.to_string(),
            "close_time": self.header.close_time.as_secs(),
            "close_time_resolution": self.header.close_time_resolution,
            "tx_root": self.header.tx_root.to_string(),
            "state_root": self.header.state_root.to_string(),
            "tx_count": self.txs.len(),
        })
    }

    /// Serialize the ledger to bytes (bincode).
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Deserialize a ledger from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

/// Accumulates the contents of a ledger, then freezes it with
/// [`build`](LedgerBuilder::build).
#[derive(Clone, Debug)]
pub struct LedgerBuilder {
    seq: LedgerSeq,
    parent_hash: LedgerHash,
    close_time: CloseTime,
    close_time_resolution: u32,
    state_root: LedgerHash,
    txs: TxMap,
}

impl LedgerBuilder {
    /// Default close-time resolution in seconds.
    pub const DEFAULT_RESOLUTION: u32 = 10;

    pub fn new(seq: LedgerSeq, parent_hash: LedgerHash) -> Self {
        Self {
            seq,
            parent_hash,
            close_time: CloseTime::EPOCH,
            close_time_resolution: Self::DEFAULT_RESOLUTION,
            state_root: LedgerHash::ZERO,
            txs: TxMap::new(),
        }
    }

    pub fn close_time(mut self, close_time: CloseTime) -> Self {
        self.close_time = close_time;
        self
    }

    pub fn close_time_resolution(mut self, secs: u32) -> Self {
        self.close_time_resolution = secs;
        self
    }

    pub fn state_root(mut self, root: LedgerHash) -> Self {
        self.state_root = root;
        self
    }

    /// Add a transaction. A later call with the same id replaces the earlier one.
    pub fn transaction(mut self, id: TxHash, tx: impl Into<Vec<u8>>, meta: Option<TxMeta>) -> Self {
        self.txs.insert(
            id,
            TxEntry {
                tx: tx.into(),
                meta,
            },
        );
        self
    }

    /// Compute the tree and ledger hashes and freeze the result.
    pub fn build(self) -> Ledger {
        let close_time = self.close_time.rounded(self.close_time_resolution);
        let tx_root = self.txs.root_hash();

        let mut hasher = Blake2b::<U32>::new();
        hasher.update(b"LWR\0");
        hasher.update(self.seq.to_le_bytes());
        hasher.update(self.parent_hash.as_bytes());
        hasher.update(close_time.as_secs().to_le_bytes());
        hasher.update(self.close_time_resolution.to_le_bytes());
        hasher.update(tx_root.as_bytes());
        hasher.update(self.state_root.as_bytes());
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());

        Ledger {
            header: LedgerHeader {
                seq: self.seq,
                hash: LedgerHash::new(hash),
                parent_hash: self.parent_hash,
                close_time,
                close_time_resolution: self.close_time_resolution,
                tx_root,
                state_root: self.state_root,
            },
            txs: self.txs,
        }
    }
}
