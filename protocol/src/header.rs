//! The 6-byte message header.
//!
//! ```text
//! byte 0     bit 7     compressed flag
//!            bits 6..4 compression algorithm (when compressed)
//!            bits 1..0 payload size, bits 25..24
//! bytes 1-3            payload size, bits 23..0
//! bytes 4-5            message type, big-endian
//! ```
//!
//! The size is the payload as it appears on the wire, i.e. the compressed
//! size for compressed messages.

use crate::compression::Algorithm;
use crate::ProtocolError;

pub const HEADER_SIZE: usize = 6;

/// Largest payload the 26-bit size field can carry.
pub const MAX_PAYLOAD_SIZE: usize = 0x03FF_FFFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    pub compressed: bool,
    pub algorithm: Algorithm,
    /// Bytes of payload following the header.
    pub payload_wire_size: usize,
    /// Raw type id. Unknown ids are passed through for the caller to judge.
    pub message_type: u16,
}

impl MessageHeader {
    /// Header plus payload.
    pub fn total_wire_size(&self) -> usize {
        HEADER_SIZE + self.payload_wire_size
    }
}

/// Encode a header. `algorithm` other than [`Algorithm::None`] marks the
/// payload as compressed.
pub fn write_header(
    payload_size: usize,
    message_type: u16,
    algorithm: Algorithm,
) -> Result<[u8; HEADER_SIZE], ProtocolError> {
    if payload_size > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: payload_size,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    let compression = match algorithm {
        Algorithm::None => 0,
        a => 0x80 | (a.id() << 4),
    };
    let size = (payload_size as u32).to_be_bytes();
    let kind = message_type.to_be_bytes();
    Ok([size[0] | compression, size[1], size[2], size[3], kind[0], kind[1]])
}

/// Decode the header at the start of `buf`.
pub fn parse_header(buf: &[u8]) -> Result<MessageHeader, ProtocolError> {
    if buf.len() < HEADER_SIZE {
        return Err(ProtocolError::Truncated {
            need: HEADER_SIZE,
            have: buf.len(),
        });
    }

    let compressed = buf[0] & 0x80 == 0x80;
    if !compressed && buf[0] & 0xFC != 0 {
        return Err(ProtocolError::Malformed(format!(
            "reserved header bits set: {:#04x}",
            buf[0]
        )));
    }
    let algorithm = if compressed {
        match Algorithm::from_id((buf[0] & 0x70) >> 4)? {
            Algorithm::None => return Err(ProtocolError::UnsupportedAlgorithm(0)),
            a => a,
        }
    } else {
        Algorithm::None
    };

    let size = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) & 0x03FF_FFFF;
    Ok(MessageHeader {
        compressed,
        algorithm,
        payload_wire_size: size as usize,
        message_type: u16::from_be_bytes([buf[4], buf[5]]),
    })
}
