use std::sync::Arc;

use crate::error::Result;

/// Bidirectional mapping between a value of type `T` and bytes.
///
/// Implementations are pure: the same input always yields the same output
/// and no state is carried between calls.
pub trait Codec<T> {
    /// Serialize `value` into a blob.
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a blob produced by [`encode`](Codec::encode).
    fn decode(&self, blob: &[u8]) -> Result<T>;
}

/// A codec selected at runtime.
pub type BoxedCodec<T> = Box<dyn Codec<T> + Send + Sync>;

impl<T, C: Codec<T> + ?Sized> Codec<T> for Box<C> {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        (**self).encode(value)
    }

    fn decode(&self, blob: &[u8]) -> Result<T> {
        (**self).decode(blob)
    }
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for Arc<C> {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        (**self).encode(value)
    }

    fn decode(&self, blob: &[u8]) -> Result<T> {
        (**self).decode(blob)
    }
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for &C {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        (**self).encode(value)
    }

    fn decode(&self, blob: &[u8]) -> Result<T> {
        (**self).decode(blob)
    }
}
