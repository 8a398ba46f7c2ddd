use std::path::PathBuf;

/// Errors that can occur in byte-stream operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind a listener to the endpoint.
    #[error("failed to bind to {endpoint}: {source}")]
    Bind {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to connect to the endpoint.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream before the requested bytes arrived.
    #[error("end of stream (peer closed the connection)")]
    EndOfStream,

    /// The local handle has been closed.
    #[error("stream closed")]
    Closed,

    /// The endpoint string could not be parsed.
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

impl TransportError {
    /// True when the connection is gone: the peer hung up or the handle was closed.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::EndOfStream | Self::Closed)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
