//! Node assembly: config, metrics and ledger history wired together.

use concord_ledger::LedgerLoader;
use concord_protocol::{Message, MessageType};
use concord_utils::{Clock, MonotonicClock};
use serde::Serialize;
use std::sync::Arc;

use crate::config::NodeConfig;
use crate::history::LedgerHistory;
use crate::metrics::NodeMetrics;
use crate::NodeError;

pub struct Node {
    config: NodeConfig,
    metrics: NodeMetrics,
    history: LedgerHistory,
}

impl Node {
    /// Build a node on the system monotonic clock.
    pub fn new(config: NodeConfig, loader: Arc<dyn LedgerLoader>) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::new()), loader)
    }

    pub fn with_clock(
        config: NodeConfig,
        clock: Arc<dyn Clock>,
        loader: Arc<dyn LedgerLoader>,
    ) -> Self {
        let metrics = NodeMetrics::new();
        let history = LedgerHistory::new(
            &config,
            clock,
            loader,
            metrics.ledger_mismatches.clone(),
        );
        tracing::info!(
            ledger_cache = config.ledger_cache_capacity(),
            ledger_cache_age = %concord_utils::format_duration(config.ledger_cache_age()),
            compression = config.compression,
            "ledger history ready"
        );
        Self {
            config,
            metrics,
            history,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn history(&self) -> &LedgerHistory {
        &self.history
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    /// Frame an outbound message, compressing if the config allows it.
    pub fn frame(
        &self,
        payload: &impl Serialize,
        message_type: MessageType,
    ) -> Result<Message, NodeError> {
        Ok(Message::new(payload, message_type, self.config.compression)?)
    }

    /// Sweep expired cache entries, refresh the gauges and render metrics.
    pub fn metrics_text(&self) -> Result<String, NodeError> {
        let swept = self.history.sweep();
        if swept > 0 {
            tracing::debug!(swept, "expired cache entries purged");
        }
        self.metrics.observe(&self.history.info());
        self.metrics.encode()
    }
}
