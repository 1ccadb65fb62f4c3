//! Wire framing: a 6-byte header (size, compression, type) in front of a
//! serialized payload, optionally LZ4-compressed.

pub mod compression;
pub mod error;
pub mod header;
pub mod message;
pub mod message_type;

pub use compression::Algorithm;
pub use error::ProtocolError;
pub use header::{parse_header, write_header, MessageHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use message::{Compressed, Message, COMPRESSION_THRESHOLD};
pub use message_type::MessageType;
