//! Value codecs.
//!
//! A codec is a pure, stateless mapping between an in-memory value and a
//! binary blob. Codecs know nothing about framing or dispatch, and they
//! compose: [`GzipCodec`] decorates any other codec.
//!
//! - [`JsonCodec`] — structured text encoding via `serde_json`
//! - [`IdentityCodec`] — pass-through for pre-serialized bytes
//! - [`GzipCodec`] — gzip applied after the inner encode, before the inner decode
//!
//! ```
//! use seqrpc_codec::{Codec, GzipCodec, JsonCodec};
//! use serde_json::{json, Value};
//!
//! let codec = GzipCodec::new(JsonCodec);
//! let value = json!(["add", [8, 4]]);
//! let blob = Codec::<Value>::encode(&codec, &value).unwrap();
//! assert_eq!(Codec::<Value>::decode(&codec, &blob).unwrap(), value);
//! ```

pub mod error;
pub mod gzip;
pub mod identity;
pub mod json;
pub mod kind;
pub mod traits;

pub use error::{CodecError, Result};
pub use gzip::{GzipCodec, DEFAULT_MAX_DECODED_SIZE};
pub use identity::IdentityCodec;
pub use json::JsonCodec;
pub use kind::CodecKind;
pub use traits::{BoxedCodec, Codec};
