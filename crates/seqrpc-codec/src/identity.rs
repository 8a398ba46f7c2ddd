use bytes::Bytes;

use crate::error::Result;
use crate::traits::Codec;

/// Pass-through codec for peers that move pre-serialized bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityCodec;

impl Codec<Vec<u8>> for IdentityCodec {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, blob: &[u8]) -> Result<Vec<u8>> {
        Ok(blob.to_vec())
    }
}

impl Codec<Bytes> for IdentityCodec {
    fn encode(&self, value: &Bytes) -> Result<Vec<u8>> {
        Ok(value.to_vec())
    }

    fn decode(&self, blob: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(blob))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_pass_through_unchanged() {
        let raw = vec![0u8, 1, 2, 255];
        let blob = IdentityCodec.encode(&raw).unwrap();
        assert_eq!(blob, raw);
        let back: Vec<u8> = IdentityCodec.decode(&blob).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn empty_blob() {
        let back: Bytes = IdentityCodec.decode(&[]).unwrap();
        assert!(back.is_empty());
    }
}
