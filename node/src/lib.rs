//! Concord node: ledger history and the ambient services around it.
//!
//! [`LedgerHistory`] is the surface the rest of the node talks to: it caches
//! ledgers, indexes validated ones by sequence, and cross-checks each
//! sequence's built ledger against the validated one. [`Node`] wires it to
//! configuration, metrics and outbound message framing.

pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod metrics;
pub mod node;

pub use config::{NodeConfig, NodeSize};
pub use error::NodeError;
pub use history::{HistoryInfo, LedgerHistory};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::Node;
