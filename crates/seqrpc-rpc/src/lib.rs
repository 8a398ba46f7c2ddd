//! Request/response layer for seqrpc.
//!
//! A [`Dispatcher`] serves named functions from a [`FunctionTable`] over one
//! framed connection; an [`Invoker`] calls them, pipelining requests and
//! matching out-of-order responses back to their calls by sequence number.

pub mod connector;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod function;
pub mod invoker;
pub mod listener;

pub use connector::{connect, connect_with_config};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use envelope::{EnvelopeError, Request, Response, Status};
pub use error::{FaultKind, Result, RpcError};
pub use function::{
    CallError, FromArgs, FunctionTable, FunctionTableBuilder, Handler, Typed,
};
pub use invoker::{Invoker, InvokerConfig, DEFAULT_MAX_PENDING};
pub use listener::{RpcListener, ShutdownHandle};
