//! Blocking byte-stream abstraction.
//!
//! This is the lowest layer of seqrpc. A [`ByteStream`] offers exactly three
//! things to the layers above it:
//! - `recv_exact(n)`: block until `n` bytes arrive, or fail with end-of-stream
//! - `send_all(bytes)`: block until every byte is accepted
//! - `close()`: idempotent orderly shutdown; afterwards everything fails
//!
//! Short reads and partial writes never leak past this layer.

pub mod endpoint;
pub mod error;
pub mod socket;
pub mod traits;

pub use endpoint::{Endpoint, Listener};
pub use error::{Result, TransportError};
pub use socket::SocketStream;
pub use traits::{ByteStream, IoStream, MAX_CHUNK};
