//! Message type ids carried in bytes 4–5 of the header.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum MessageType {
    Manifests = 2,
    Ping = 3,
    Cluster = 5,
    Endpoints = 15,
    Transaction = 30,
    GetLedger = 31,
    LedgerData = 32,
    ProposeLedger = 33,
    StatusChange = 34,
    HaveSet = 35,
    Validation = 41,
    GetObjects = 42,
    GetShardInfo = 50,
    ShardInfo = 51,
    GetPeerShardInfo = 52,
    PeerShardInfo = 53,
    ValidatorList = 54,
}

impl MessageType {
    pub const ALL: [MessageType; 17] = [
        Self::Manifests,
        Self::Ping,
        Self::Cluster,
        Self::Endpoints,
        Self::Transaction,
        Self::GetLedger,
        Self::LedgerData,
        Self::ProposeLedger,
        Self::StatusChange,
        Self::HaveSet,
        Self::Validation,
        Self::GetObjects,
        Self::GetShardInfo,
        Self::ShardInfo,
        Self::GetPeerShardInfo,
        Self::PeerShardInfo,
        Self::ValidatorList,
    ];

    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Short name used in logs and traffic accounting.
    pub fn name(self) -> &'static str {
        match self {
            Self::Manifests => "manifests",
            Self::Ping => "ping",
            Self::Cluster => "cluster",
            Self::Endpoints => "endpoints",
            Self::Transaction => "tx",
            Self::GetLedger => "get_ledger",
            Self::LedgerData => "ledger_data",
            Self::ProposeLedger => "propose",
            Self::StatusChange => "status",
            Self::HaveSet => "have_set",
            Self::Validation => "validation",
            Self::GetObjects => "get_objects",
            Self::GetShardInfo => "get_shard_info",
            Self::ShardInfo => "shard_info",
            Self::GetPeerShardInfo => "get_peer_shard_info",
            Self::PeerShardInfo => "peer_shard_info",
            Self::ValidatorList => "validator_list",
        }
    }

    /// Bulk message types worth compressing.
    pub fn is_compressible(self) -> bool {
        matches!(
            self,
            Self::Manifests
                | Self::Endpoints
                | Self::Transaction
                | Self::GetLedger
                | Self::LedgerData
                | Self::GetObjects
                | Self::ValidatorList
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip() {
        for t in MessageType::ALL {
            assert_eq!(MessageType::from_id(t.id()), Some(t));
        }
        assert_eq!(MessageType::from_id(1), None);
        assert_eq!(MessageType::from_id(0xFFFF), None);
    }

    #[test]
    fn compressible_allow_list() {
        let compressible: Vec<u16> = MessageType::ALL
            .into_iter()
            .filter(|t| t.is_compressible())
            .map(MessageType::id)
            .collect();
        assert_eq!(compressible, vec![2, 15, 30, 31, 32, 42, 54]);
    }
}
