/// Errors that can occur while encoding or decoding a value.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value cannot be represented in the codec's format.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The bytes are not valid for the codec's format.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The compression layer failed.
    #[error("compression failed: {0}")]
    Compression(#[source] std::io::Error),

    /// No codec is registered under this name.
    #[error("unknown codec '{0}' (expected one of: json, json-gzip)")]
    UnknownKind(String),

    /// The decompression layer failed (corrupt or truncated stream).
    #[error("decompression failed: {0}")]
    Decompression(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
