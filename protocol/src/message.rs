//! Framed outbound messages and payload decoding.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::compression::{self, Algorithm};
use crate::header::{parse_header, write_header, MessageHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use crate::{MessageType, ProtocolError};

/// Payloads at or below this size are never compressed.
pub const COMPRESSION_THRESHOLD: usize = 70;

/// Which buffer a sender wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compressed {
    On,
    Off,
}

/// A framed message, ready to send.
///
/// Always holds the uncompressed frame. Also holds a compressed frame when
/// compression was enabled, the type is compressible, the payload is larger
/// than [`COMPRESSION_THRESHOLD`] and compressing made it smaller.
#[derive(Clone, Debug)]
pub struct Message {
    message_type: MessageType,
    buffer: Vec<u8>,
    buffer_compressed: Option<Vec<u8>>,
}

impl Message {
    /// Serialize `payload` with bincode and frame it.
    pub fn new(
        payload: &impl Serialize,
        message_type: MessageType,
        compression_enabled: bool,
    ) -> Result<Self, ProtocolError> {
        let bytes =
            bincode::serialize(payload).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        Self::from_payload(bytes, message_type, compression_enabled)
    }

    /// Frame an already-serialized payload.
    pub fn from_payload(
        payload: Vec<u8>,
        message_type: MessageType,
        compression_enabled: bool,
    ) -> Result<Self, ProtocolError> {
        if payload.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let compressible = compression_enabled
            && message_type.is_compressible()
            && payload.len() > COMPRESSION_THRESHOLD;
        let buffer_compressed = if compressible {
            Self::try_compress(&payload, message_type)?
        } else {
            None
        };

        let mut buffer = Vec::with_capacity(HEADER_SIZE + payload.len());
        buffer.extend_from_slice(&write_header(
            payload.len(),
            message_type.id(),
            Algorithm::None,
        )?);
        buffer.extend_from_slice(&payload);

        Ok(Self {
            message_type,
            buffer,
            buffer_compressed,
        })
    }

    fn try_compress(
        payload: &[u8],
        message_type: MessageType,
    ) -> Result<Option<Vec<u8>>, ProtocolError> {
        let packed = compression::compress(payload)?;
        if packed.len() >= payload.len() {
            tracing::trace!(
                kind = %message_type,
                size = payload.len(),
                compressed = packed.len(),
                "compression skipped, no gain"
            );
            return Ok(None);
        }
        let mut framed = Vec::with_capacity(HEADER_SIZE + packed.len());
        framed.extend_from_slice(&write_header(
            packed.len(),
            message_type.id(),
            Algorithm::Lz4,
        )?);
        framed.extend_from_slice(&packed);
        Ok(Some(framed))
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The compressed frame if requested and available, else the
    /// uncompressed one.
    pub fn buffer(&self, compressed: Compressed) -> &[u8] {
        match (compressed, &self.buffer_compressed) {
            (Compressed::On, Some(framed)) => framed,
            _ => &self.buffer,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.buffer_compressed.is_some()
    }

    /// Split one complete frame into its header and uncompressed payload.
    pub fn decode_payload(frame: &[u8]) -> Result<(MessageHeader, Vec<u8>), ProtocolError> {
        let header = parse_header(frame)?;
        let end = header.total_wire_size();
        if frame.len() < end {
            return Err(ProtocolError::Truncated {
                need: end,
                have: frame.len(),
            });
        }
        let wire = &frame[HEADER_SIZE..end];
        let payload = match (header.compressed, header.algorithm) {
            (false, _) => wire.to_vec(),
            (true, Algorithm::Lz4) => compression::decompress(wire)?,
            (true, Algorithm::None) => return Err(ProtocolError::UnsupportedAlgorithm(0)),
        };
        Ok((header, payload))
    }

    /// Decode one frame into a typed payload.
    pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<(MessageType, T), ProtocolError> {
        let (header, payload) = Self::decode_payload(frame)?;
        let kind = MessageType::from_id(header.message_type).ok_or_else(|| {
            ProtocolError::Malformed(format!("unknown message type {}", header.message_type))
        })?;
        let value = bincode::deserialize(&payload)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        Ok((kind, value))
    }
}
