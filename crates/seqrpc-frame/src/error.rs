use seqrpc_transport::TransportError;

/// Errors that can occur while sending or receiving frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An inbound frame declared a payload above the maximum. The payload
    /// was skipped, so the stream is still aligned on the next header.
    #[error("frame {sequence} too large ({size} bytes, max {max}); payload skipped")]
    OversizedFrame { sequence: u32, size: usize, max: usize },

    /// Every sequence number of this connection has been issued.
    #[error("sequence space exhausted (last issued {last})")]
    SequenceExhausted { last: u32 },

    /// The underlying byte stream failed, including end-of-stream.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// True when the connection is gone (peer hung up, truncated frame, or
    /// the local handle was closed).
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_disconnect())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
