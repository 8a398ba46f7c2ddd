//! Length-prefixed, sequence-numbered message framing.
//!
//! Every message on the wire is an 8-byte header followed by the payload:
//! - a 4-byte big-endian sequence number
//! - a 4-byte big-endian payload length
//!
//! There is no magic number, version byte, or checksum. Length is always sent
//! before the payload; it is never inferred from end-of-stream.

pub mod codec;
pub mod error;
pub mod sequence;
pub mod transport;

pub use codec::{
    decode_header, encode_frame, encode_header, Frame, FrameConfig, FrameHeader,
    DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use sequence::SequenceCounter;
pub use transport::FramedTransport;
