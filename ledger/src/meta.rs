//! Transaction metadata, the outcome of applying a transaction to a ledger.

use concord_types::LedgerHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Numeric engine result of applying a transaction. Zero is success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxResult(pub i32);

impl TxResult {
    pub const SUCCESS: Self = Self(0);

    pub fn code(&self) -> i32 {
        self.0
    }

    pub fn is_success(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TxResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a transaction changed a ledger entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeChange {
    Created,
    Modified,
    Deleted,
}

/// One ledger entry touched by a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedNode {
    pub change: NodeChange,
    /// Kind of entry (e.g. `"AccountRoot"`).
    pub entry_type: String,
    /// Key of the entry in the state tree.
    pub entry_key: LedgerHash,
    /// Field name -> rendered value after the change.
    pub fields: BTreeMap<String, String>,
}

/// Metadata recorded alongside a transaction in the transaction tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMeta {
    pub result: TxResult,
    /// Order in which the transaction was applied within its ledger.
    pub index: u32,
    pub affected_nodes: Vec<AffectedNode>,
}

impl TxMeta {
    pub fn new(result: TxResult, index: u32) -> Self {
        Self {
            result,
            index,
            affected_nodes: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: AffectedNode) -> Self {
        self.affected_nodes.push(node);
        self
    }

    /// Full JSON rendering, used for detailed diagnostics.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
