//! Payload compression.
//!
//! A compressed payload is the original size, encoded in 1–4 bytes, followed
//! by an LZ4 frame. The top two bits of the first size byte give the number
//! of size bytes (`01` = 1, `10` = 2, `11` = 3, `00` = 4), leaving at most
//! 30 bits for the size itself.

use std::io::{Read, Write};

use crate::ProtocolError;

/// Largest original size the prefix can express.
pub const MAX_ORIGINAL_SIZE: usize = 0x3FFF_FFFF;

/// Compression algorithm id, as carried in header bits 6..4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    None = 0,
    Lz4 = 1,
}

impl Algorithm {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self, ProtocolError> {
        match id {
            0 => Ok(Self::None),
            1 => Ok(Self::Lz4),
            other => Err(ProtocolError::UnsupportedAlgorithm(other)),
        }
    }
}

/// Encode `size` as a 1–4 byte prefix.
pub fn write_size(size: usize) -> Result<Vec<u8>, ProtocolError> {
    if size > MAX_ORIGINAL_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size,
            max: MAX_ORIGINAL_SIZE,
        });
    }
    let v = size as u32;
    let n: u32 = match v {
        0..=0x3F => 1,
        0x40..=0x3FFF => 2,
        0x4000..=0x3F_FFFF => 3,
        _ => 4,
    };
    // n = 4 wraps to a zero tag.
    let tagged = (v << (8 * (4 - n))) | (n << 30);
    Ok(tagged.to_be_bytes()[..n as usize].to_vec())
}

/// Decode a size prefix. Returns `(size, prefix_len)`.
pub fn read_size(buf: &[u8]) -> Result<(usize, usize), ProtocolError> {
    let first = *buf.first().ok_or(ProtocolError::Truncated { need: 1, have: 0 })?;
    let n = match first >> 6 {
        0 => 4,
        n => n as usize,
    };
    if buf.len() < n {
        return Err(ProtocolError::Truncated {
            need: n,
            have: buf.len(),
        });
    }
    let mut word = [0u8; 4];
    word[..n].copy_from_slice(&buf[..n]);
    let v = (u32::from_be_bytes(word) & 0x3FFF_FFFF) >> (8 * (4 - n));
    Ok((v as usize, n))
}

/// Size prefix followed by an LZ4 frame of `data`.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let out = write_size(data.len())?;
    let mut encoder = lz4::EncoderBuilder::new()
        .build(out)
        .map_err(|e| ProtocolError::Compression(e.to_string()))?;
    encoder
        .write_all(data)
        .map_err(|e| ProtocolError::Compression(e.to_string()))?;
    let (out, result) = encoder.finish();
    result.map_err(|e| ProtocolError::Compression(e.to_string()))?;
    Ok(out)
}

/// Initial output buffer is at most this many times the compressed input.
const MAX_INITIAL_EXPANSION: usize = 64;

/// Inverse of [`compress`]. The decoded length must match the prefix, and
/// decoding stops one byte past it.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let (size, prefix) = read_size(data)?;
    let frame = &data[prefix..];
    let decoder =
        lz4::Decoder::new(frame).map_err(|e| ProtocolError::Compression(e.to_string()))?;
    let mut out = Vec::with_capacity(size.min(frame.len().saturating_mul(MAX_INITIAL_EXPANSION)));
    decoder
        .take(size as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| ProtocolError::Compression(e.to_string()))?;
    if out.len() != size {
        return Err(ProtocolError::Malformed(format!(
            "decompressed {} bytes, prefix says {size}",
            out.len()
        )));
    }
    Ok(out)
}
