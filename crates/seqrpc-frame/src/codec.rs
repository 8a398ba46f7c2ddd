use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: sequence (4) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// A received message and the sequence number it was tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence: u32,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(sequence: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Decoded fixed-size frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub sequence: u32,
    pub length: u32,
}

/// Encode a header into its 8-byte wire form.
///
/// ```text
/// ┌──────────────────┬──────────────────┬─────────────────┐
/// │ Sequence (4B BE) │ Length (4B BE)   │ Payload          │
/// │                  │                  │ (Length bytes)   │
/// └──────────────────┴──────────────────┴─────────────────┘
/// ```
pub fn encode_header(header: FrameHeader) -> [u8; HEADER_SIZE] {
    let mut out = [0u8; HEADER_SIZE];
    out[..4].copy_from_slice(&header.sequence.to_be_bytes());
    out[4..].copy_from_slice(&header.length.to_be_bytes());
    out
}

/// Decode an 8-byte wire header.
pub fn decode_header(bytes: &[u8; HEADER_SIZE]) -> FrameHeader {
    let [s0, s1, s2, s3, l0, l1, l2, l3] = *bytes;
    FrameHeader {
        sequence: u32::from_be_bytes([s0, s1, s2, s3]),
        length: u32::from_be_bytes([l0, l1, l2, l3]),
    }
}

/// Append a complete frame (header + payload) to `dst`.
pub fn encode_frame(sequence: u32, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let length = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&encode_header(FrameHeader { sequence, length }));
    dst.put_slice(payload);
    Ok(())
}

/// Configuration for framed transports.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes, enforced on send and receive. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout applied to socket streams.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout applied to socket streams.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
