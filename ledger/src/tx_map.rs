//! Transaction tree of a ledger.
//!
//! Maps transaction id -> (serialized transaction, optional metadata). Keys
//! are kept sorted so leaves can be walked in key order, which the
//! divergence diff depends on.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use concord_types::{LedgerHash, TxHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::meta::{NodeChange, TxMeta};

/// A leaf of the transaction tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEntry {
    /// Serialized transaction.
    pub tx: Vec<u8>,
    pub meta: Option<TxMeta>,
}

/// Sorted transaction tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMap {
    entries: BTreeMap<TxHash, TxEntry>,
}

impl TxMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TxHash, entry: TxEntry) -> Option<TxEntry> {
        self.entries.insert(id, entry)
    }

    pub fn get(&self, id: &TxHash) -> Option<&TxEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Leaves in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&TxHash, &TxEntry)> {
        self.entries.iter()
    }

    /// Blake2b-256 over every leaf in key order.
    ///
    /// The empty tree still hashes to a non-zero value; a zero root only
    /// appears in headers that were never computed.
    pub fn root_hash(&self) -> LedgerHash {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(b"TXN\0");
        for (id, entry) in &self.entries {
            hasher.update(id.as_bytes());
            hasher.update((entry.tx.len() as u64).to_le_bytes());
            hasher.update(&entry.tx);
            match &entry.meta {
                None => hasher.update([0u8]),
                Some(meta) => {
                    hasher.update([1u8]);
                    hash_meta(&mut hasher, meta);
                }
            }
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        LedgerHash::new(out)
    }
}

fn hash_meta(hasher: &mut Blake2b<U32>, meta: &TxMeta) {
    hasher.update(meta.result.code().to_le_bytes());
    hasher.update(meta.index.to_le_bytes());
    hasher.update((meta.affected_nodes.len() as u64).to_le_bytes());
    for node in &meta.affected_nodes {
        hasher.update([match node.change {
            NodeChange::Created => 0u8,
            NodeChange::Modified => 1,
            NodeChange::Deleted => 2,
        }]);
        hasher.update(node.entry_type.as_bytes());
        hasher.update([0u8]);
        hasher.update(node.entry_key.as_bytes());
        for (name, value) in &node.fields {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
    }
}
