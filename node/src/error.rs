use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("protocol error: {0}")]
    Protocol(#[from] concord_protocol::ProtocolError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config error: {0}")]
    Config(String),
}
