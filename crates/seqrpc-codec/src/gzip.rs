use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{CodecError, Result};
use crate::traits::Codec;

/// Default cap on the decompressed size of one blob (16 MiB).
pub const DEFAULT_MAX_DECODED_SIZE: usize = 16 * 1024 * 1024;

/// Decorator that gzips the output of an inner codec.
///
/// Encoding is `inner.encode → compress`; decoding is
/// `decompress → inner.decode`. Any codec can be wrapped, including another
/// decorator.
///
/// Decompressed output is capped at `max_decoded_size` bytes, so a small
/// compressed frame cannot expand without bound.
#[derive(Debug, Clone)]
pub struct GzipCodec<C> {
    inner: C,
    level: Compression,
    max_decoded_size: usize,
}

impl<C> GzipCodec<C> {
    /// Wrap `inner` with the default compression level.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            level: Compression::default(),
            max_decoded_size: DEFAULT_MAX_DECODED_SIZE,
        }
    }

    /// Set the compression level (0 = store, 9 = best).
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Compression::new(level.min(9));
        self
    }

    /// Set the largest decompressed blob `decode` will accept.
    pub fn with_max_decoded_size(mut self, limit: usize) -> Self {
        self.max_decoded_size = limit;
        self
    }

    pub fn max_decoded_size(&self) -> usize {
        self.max_decoded_size
    }

    /// The wrapped codec.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<T, C: Codec<T>> Codec<T> for GzipCodec<C> {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        let plain = self.inner.encode(value)?;

        let mut encoder = GzEncoder::new(Vec::with_capacity(plain.len() / 2), self.level);
        encoder.write_all(&plain).map_err(CodecError::Compression)?;
        encoder.finish().map_err(CodecError::Compression)
    }

    fn decode(&self, blob: &[u8]) -> Result<T> {
        let limit = self.max_decoded_size;
        let mut plain = Vec::new();
        GzDecoder::new(blob)
            .take(limit as u64 + 1)
            .read_to_end(&mut plain)
            .map_err(CodecError::Decompression)?;
        if plain.len() > limit {
            return Err(CodecError::Decompression(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("decompressed size exceeds limit of {limit} bytes"),
            )));
        }
        self.inner.decode(&plain)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::identity::IdentityCodec;
    use crate::json::JsonCodec;

    fn samples() -> Vec<Value> {
        vec![
            json!([]),
            json!(["add", [8, 4]]),
            json!({"nested": {"list": [1, {"deep": [true, null]}]}}),
            json!("ünïcødé ✓"),
            json!("x".repeat(10_000)),
        ]
    }

    #[test]
    fn matches_base_codec_roundtrip() {
        let base = JsonCodec;
        let gzip = GzipCodec::new(JsonCodec);

        for value in samples() {
            let plain = Codec::<Value>::encode(&base, &value).unwrap();
            let packed = Codec::<Value>::encode(&gzip, &value).unwrap();
            let via_base: Value = base.decode(&plain).unwrap();
            let via_gzip: Value = gzip.decode(&packed).unwrap();
            assert_eq!(via_gzip, via_base);
            assert_eq!(via_gzip, value);
        }
    }

    #[test]
    fn output_is_gzip_stream() {
        let blob = Codec::<Value>::encode(&GzipCodec::new(JsonCodec), &json!([1, 2, 3])).unwrap();
        assert_eq!(&blob[..2], &[0x1F, 0x8B]);
    }

    #[test]
    fn compresses_repetitive_payloads() {
        let value = json!("abc".repeat(4096));
        let plain = Codec::<Value>::encode(&JsonCodec, &value).unwrap();
        let codec = GzipCodec::new(JsonCodec).with_level(9);
        let packed = Codec::<Value>::encode(&codec, &value).unwrap();
        assert!(packed.len() < plain.len() / 10);
    }

    #[test]
    fn wraps_identity_codec() {
        let codec = GzipCodec::new(IdentityCodec).with_level(1);
        let raw = b"raw bytes raw bytes raw bytes".to_vec();
        let blob = codec.encode(&raw).unwrap();
        let back: Vec<u8> = codec.decode(&blob).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn nested_decorators_compose() {
        let codec = GzipCodec::new(GzipCodec::new(JsonCodec));
        let value = json!({"k": "v"});
        let blob = Codec::<Value>::encode(&codec, &value).unwrap();
        let back: Value = codec.decode(&blob).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn corrupt_stream_is_decompression_error() {
        let codec = GzipCodec::new(JsonCodec);
        let err = Codec::<Value>::decode(&codec, b"definitely not gzip").unwrap_err();
        assert!(matches!(err, CodecError::Decompression(_)));
    }

    #[test]
    fn oversized_decompression_is_rejected() {
        let zeros = vec![0u8; 4 * 1024 * 1024];
        let blob = GzipCodec::new(IdentityCodec).with_level(9).encode(&zeros).unwrap();
        assert!(blob.len() < 64 * 1024);

        let codec = GzipCodec::new(IdentityCodec).with_max_decoded_size(1024 * 1024);
        let err = Codec::<Vec<u8>>::decode(&codec, &blob).unwrap_err();
        assert!(matches!(err, CodecError::Decompression(_)));
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn decompression_at_exact_limit_is_accepted() {
        let raw = vec![7u8; 4096];
        let blob = GzipCodec::new(IdentityCodec).encode(&raw).unwrap();
        let codec = GzipCodec::new(IdentityCodec).with_max_decoded_size(4096);
        let back: Vec<u8> = codec.decode(&blob).unwrap();
        assert_eq!(back, raw);

        let tight = GzipCodec::new(IdentityCodec).with_max_decoded_size(4095);
        assert!(Codec::<Vec<u8>>::decode(&tight, &blob).is_err());
    }

    #[test]
    fn default_limit_is_sixteen_mib() {
        assert_eq!(GzipCodec::new(JsonCodec).max_decoded_size(), DEFAULT_MAX_DECODED_SIZE);
    }

    #[test]
    fn valid_gzip_with_bad_inner_bytes_is_decode_error() {
        let blob = GzipCodec::new(IdentityCodec).encode(&b"{oops".to_vec()).unwrap();
        let err = Codec::<Value>::decode(&GzipCodec::new(JsonCodec), &blob).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
