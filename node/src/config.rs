//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::logging::LogFormat;
use crate::NodeError;

/// Coarse sizing class. Selects the ledger-cache capacity and age.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeSize {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
}

impl NodeSize {
    /// Ledgers held in memory.
    pub fn ledger_cache_capacity(self) -> usize {
        match self {
            Self::Tiny => 32,
            Self::Small => 128,
            Self::Medium => 256,
            Self::Large => 384,
            Self::Huge => 768,
        }
    }

    pub fn ledger_cache_age(self) -> Duration {
        Duration::from_secs(match self {
            Self::Tiny => 30,
            Self::Small => 60,
            Self::Medium => 180,
            Self::Large => 300,
            Self::Huge => 600,
        })
    }
}

/// Configuration for a Concord node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node_size: NodeSize,

    /// Overrides the ledger-cache capacity implied by `node_size`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_cache_size: Option<usize>,

    /// Overrides the ledger-cache age implied by `node_size`, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_cache_age_secs: Option<u64>,

    /// Whether outbound messages may be compressed.
    #[serde(default)]
    pub compression: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn ledger_cache_capacity(&self) -> usize {
        self.ledger_cache_size
            .unwrap_or_else(|| self.node_size.ledger_cache_capacity())
    }

    pub fn ledger_cache_age(&self) -> Duration {
        self.ledger_cache_age_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.node_size.ledger_cache_age())
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_size: NodeSize::default(),
            ledger_cache_size: None,
            ledger_cache_age_secs: None,
            compression: false,
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig {
            node_size: NodeSize::Large,
            ledger_cache_size: Some(500),
            ..NodeConfig::default()
        };
        let parsed = NodeConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(parsed.node_size, NodeSize::Large);
        assert_eq!(parsed.ledger_cache_size, Some(500));
        assert_eq!(parsed.ledger_cache_age_secs, None);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.node_size, NodeSize::Medium);
        assert_eq!(config.ledger_cache_capacity(), 256);
        assert_eq!(config.ledger_cache_age(), Duration::from_secs(180));
        assert!(!config.compression);
        assert_eq!(config.log_format().unwrap(), LogFormat::Human);
    }

    #[test]
    fn node_size_selects_cache_sizing() {
        let config = NodeConfig::from_toml_str(r#"node_size = "tiny""#).unwrap();
        assert_eq!(config.ledger_cache_capacity(), 32);
        assert_eq!(config.ledger_cache_age(), Duration::from_secs(30));

        let config = NodeConfig::from_toml_str(r#"node_size = "huge""#).unwrap();
        assert_eq!(config.ledger_cache_capacity(), 768);
        assert_eq!(config.ledger_cache_age(), Duration::from_secs(600));
    }

    #[test]
    fn explicit_overrides_win() {
        let toml = r#"
            node_size = "small"
            ledger_cache_size = 1000
            ledger_cache_age_secs = 15
            compression = true
            log_format = "json"
        "#;
        let config = NodeConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.ledger_cache_capacity(), 1000);
        assert_eq!(config.ledger_cache_age(), Duration::from_secs(15));
        assert!(config.compression);
        assert_eq!(config.log_format().unwrap(), LogFormat::Json);
    }

    #[test]
    fn unknown_node_size_is_a_config_error() {
        assert!(matches!(
            NodeConfig::from_toml_str(r#"node_size = "gigantic""#),
            Err(NodeError::Config(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "node_size = \"large\"\nlog_level = \"debug\"").unwrap();
        let config = NodeConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.ledger_cache_capacity(), 384);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/concord.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
