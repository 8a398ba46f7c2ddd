use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, Result};
use crate::traits::Codec;

/// Structured text codec backed by `serde_json`.
///
/// Works for any `Serialize + DeserializeOwned` type; the RPC layers use it
/// with `serde_json::Value`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|err| CodecError::Encode(err.to_string()))
    }

    fn decode(&self, blob: &[u8]) -> Result<T> {
        serde_json::from_slice(blob).map_err(|err| CodecError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::{json, Value};

    use super::*;

    fn roundtrip(value: Value) {
        let blob = Codec::<Value>::encode(&JsonCodec, &value).unwrap();
        let decoded: Value = JsonCodec.decode(&blob).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn roundtrips_representative_values() {
        roundtrip(json!(null));
        roundtrip(json!([]));
        roundtrip(json!({}));
        roundtrip(json!([1, 2.5, -3, true, null, "x"]));
        roundtrip(json!({"outer": {"inner": [1, [2, [3]]], "flag": false}}));
        roundtrip(json!("grüße, 世界 🚀"));
        roundtrip(json!(""));
    }

    #[test]
    fn typed_values_roundtrip() {
        let value = (String::from("add"), vec![8i64, 4]);
        let blob = JsonCodec.encode(&value).unwrap();
        let decoded: (String, Vec<i64>) = JsonCodec.decode(&blob).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn invalid_bytes_are_decode_errors() {
        let err = Codec::<Value>::decode(&JsonCodec, b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));

        let err = Codec::<Value>::decode(&JsonCodec, &[0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn unrepresentable_values_are_encode_errors() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1u8);
        let err = JsonCodec.encode(&map).unwrap_err();
        assert!(matches!(err, CodecError::Encode(_)));
    }
}
