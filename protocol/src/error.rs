use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message too large: {size} > {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("empty message payload")]
    EmptyPayload,

    #[error("truncated message: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("unsupported compression algorithm: {0}")]
    UnsupportedAlgorithm(u8),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}
