//! Prometheus metrics for the Concord node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]. The mismatch counter is
//! handed to the consensus tracker, which increments it once per diagnosed
//! divergence. The gauges are refreshed from [`HistoryInfo`] snapshots.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::history::HistoryInfo;
use crate::NodeError;

pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    /// Built/validated mismatches diagnosed, including unanalyzable ones.
    pub ledger_mismatches: IntCounter,

    /// Ledgers currently held in the ledger cache.
    pub ledger_cache_size: IntGauge,
    /// Reconciliation records currently tracked.
    pub consensus_cache_size: IntGauge,
    /// Entries in the sequence index.
    pub ledgers_by_index: IntGauge,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let ledger_mismatches = register_int_counter_with_registry!(
            Opts::new(
                "concord_ledger_mismatch_total",
                "Built and validated ledgers that disagreed for the same sequence"
            ),
            registry
        )
        .expect("failed to register ledger_mismatches counter");

        let ledger_cache_size = register_int_gauge_with_registry!(
            Opts::new("concord_ledger_cache_size", "Ledgers held in the ledger cache"),
            registry
        )
        .expect("failed to register ledger_cache_size gauge");

        let consensus_cache_size = register_int_gauge_with_registry!(
            Opts::new(
                "concord_consensus_cache_size",
                "Built/validated reconciliation records tracked"
            ),
            registry
        )
        .expect("failed to register consensus_cache_size gauge");

        let ledgers_by_index = register_int_gauge_with_registry!(
            Opts::new("concord_ledgers_by_index", "Entries in the sequence index"),
            registry
        )
        .expect("failed to register ledgers_by_index gauge");

        Self {
            registry,
            ledger_mismatches,
            ledger_cache_size,
            consensus_cache_size,
            ledgers_by_index,
        }
    }

    /// Refresh the gauges from a history snapshot.
    pub fn observe(&self, info: &HistoryInfo) {
        self.ledger_cache_size.set(info.ledger_cache.size as i64);
        self.consensus_cache_size
            .set(info.consensus_validated.size as i64);
        self.ledgers_by_index.set(info.ledgers_by_index as i64);
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
