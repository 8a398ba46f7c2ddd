use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::CodecError;
use crate::gzip::GzipCodec;
use crate::json::JsonCodec;
use crate::traits::BoxedCodec;

/// Named codec choice for configuration surfaces.
///
/// Both sides of a connection must agree; nothing on the wire identifies
/// the codec in use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodecKind {
    #[default]
    Json,
    JsonGzip,
}

impl CodecKind {
    pub const ALL: [CodecKind; 2] = [CodecKind::Json, CodecKind::JsonGzip];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonGzip => "json-gzip",
        }
    }

    /// Build a value codec for this kind.
    pub fn build(self) -> BoxedCodec<Value> {
        match self {
            Self::Json => Box::new(JsonCodec),
            Self::JsonGzip => Box::new(GzipCodec::new(JsonCodec)),
        }
    }
}

impl FromStr for CodecKind {
    type Err = CodecError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "json-gzip" | "json+gzip" | "gzip" => Ok(Self::JsonGzip),
            other => Err(CodecError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_names() {
        assert_eq!("json".parse::<CodecKind>().unwrap(), CodecKind::Json);
        assert_eq!("JSON-GZIP".parse::<CodecKind>().unwrap(), CodecKind::JsonGzip);
        assert_eq!("gzip".parse::<CodecKind>().unwrap(), CodecKind::JsonGzip);
        assert!(matches!(
            "msgpack".parse::<CodecKind>(),
            Err(CodecError::UnknownKind(name)) if name == "msgpack"
        ));
    }

    #[test]
    fn display_parses_back() {
        for kind in CodecKind::ALL {
            assert_eq!(kind.to_string().parse::<CodecKind>().unwrap(), kind);
        }
    }

    #[test]
    fn built_codecs_roundtrip() {
        let value = json!(["echo", ["hi", {"n": 1}]]);
        for kind in CodecKind::ALL {
            let codec = kind.build();
            let blob = codec.encode(&value).unwrap();
            assert_eq!(codec.decode(&blob).unwrap(), value, "{kind}");
        }
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let blob = CodecKind::JsonGzip.build().encode(&json!([1])).unwrap();
        assert!(CodecKind::Json.build().decode(&blob).is_err());
    }
}
