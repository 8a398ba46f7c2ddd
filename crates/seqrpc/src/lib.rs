//! Minimal pipelined RPC over sequence-numbered frames.
//!
//! seqrpc layers a request/response protocol over any ordered, reliable
//! byte stream: frames carry a sequence number and a length, a pluggable
//! codec turns envelopes into bytes, and the client side may keep several
//! calls in flight on one connection.
//!
//! # Crate Structure
//!
//! - [`transport`] — Byte streams over TCP, Unix sockets, or any std I/O object
//! - [`frame`] — Length-prefixed, sequence-numbered framing
//! - [`codec`] — JSON, identity, and gzip codecs
//! - [`rpc`] — Dispatcher, invoker, and function registration (behind `rpc` feature)

/// Re-export transport types.
pub mod transport {
    pub use seqrpc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use seqrpc_frame::*;
}

/// Re-export codec types.
pub mod codec {
    pub use seqrpc_codec::*;
}

/// Re-export RPC types (requires `rpc` feature).
#[cfg(feature = "rpc")]
pub mod rpc {
    pub use seqrpc_rpc::*;
}
