use seqrpc_codec::CodecError;
use seqrpc_frame::FrameError;
use seqrpc_transport::TransportError;

/// The three fault categories an RPC can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The byte channel is gone or failed. Fatal to the connection.
    Transport,
    /// Malformed data, unknown function, bad arguments, codec mismatch.
    Protocol,
    /// The invoked function itself failed.
    Application,
}

/// Errors that can occur in RPC operations.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Connection establishment or other stream-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level failure, including end-of-stream.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A local encode or decode failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The peer reported, or we detected, a protocol-level problem.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote function failed; carries its textual representation.
    #[error("remote exception: {0}")]
    RemoteException(String),

    /// The awaited sequence was never sent on this connection or was
    /// already consumed.
    #[error("sequence {0} has no outstanding request")]
    UnknownSequence(u32),

    /// Too many responses buffered for calls nobody is awaiting.
    #[error("pending-response table full ({limit} buffered responses)")]
    PendingOverflow { limit: usize },

    /// Two functions were registered under the same name.
    #[error("function '{0}' registered twice")]
    DuplicateFunction(String),
}

impl RpcError {
    /// Which fault category this error belongs to.
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Transport(_) | Self::Frame(FrameError::Transport(_)) => FaultKind::Transport,
            Self::RemoteException(_) => FaultKind::Application,
            Self::Frame(_)
            | Self::Codec(_)
            | Self::Protocol(_)
            | Self::UnknownSequence(_)
            | Self::PendingOverflow { .. }
            | Self::DuplicateFunction(_) => FaultKind::Protocol,
        }
    }

    /// True when the connection is gone (peer hung up or handle closed).
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_disconnect(),
            Self::Frame(err) => err.is_disconnect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_fault_kinds() {
        let eos = RpcError::Frame(FrameError::Transport(TransportError::EndOfStream));
        assert_eq!(eos.kind(), FaultKind::Transport);
        assert!(eos.is_disconnect());

        let io = RpcError::Frame(FrameError::Transport(TransportError::Io(
            std::io::Error::from(std::io::ErrorKind::TimedOut),
        )));
        assert_eq!(io.kind(), FaultKind::Transport);
        assert!(!io.is_disconnect());

        let too_large = RpcError::Frame(FrameError::PayloadTooLarge { size: 2, max: 1 });
        assert_eq!(too_large.kind(), FaultKind::Protocol);

        assert_eq!(
            RpcError::Protocol("unknown function".into()).kind(),
            FaultKind::Protocol
        );
        assert_eq!(
            RpcError::Codec(CodecError::Decode("x".into())).kind(),
            FaultKind::Protocol
        );
        assert_eq!(
            RpcError::RemoteException("bad".into()).kind(),
            FaultKind::Application
        );
    }
}
