use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use seqrpc_codec::Codec;
use seqrpc_frame::{FrameError, FramedTransport};
use seqrpc_transport::ByteStream;
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::{Request, Response, Status};
use crate::error::Result;
use crate::function::{CallError, FunctionTable, Handler};

/// What one [`Dispatcher::dispatch_once`] cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sequence of the request, echoed on the response.
    pub sequence: u32,
    /// Requested function, if the request was well-formed enough to name one.
    pub function: Option<String>,
    /// Status of the response actually sent.
    pub status: Status,
}

/// Serves requests arriving on one connection.
///
/// Every received frame gets exactly one response carrying the same
/// sequence. Oversized frames, decode failures, malformed envelopes,
/// unknown functions and argument mismatches are answered with an ERROR
/// response; handler
/// failures and panics with an EXCEPTION response. Only transport faults
/// and a response that cannot be encoded even as an error are returned.
pub struct Dispatcher<S, C> {
    transport: FramedTransport<S>,
    codec: C,
    functions: Arc<FunctionTable>,
}

impl<S: ByteStream, C: Codec<Value>> Dispatcher<S, C> {
    pub fn new(
        transport: FramedTransport<S>,
        codec: C,
        functions: impl Into<Arc<FunctionTable>>,
    ) -> Self {
        Self {
            transport,
            codec,
            functions: functions.into(),
        }
    }

    /// Receive one request, run it, and send its response.
    pub fn dispatch_once(&mut self) -> Result<DispatchReport> {
        let frame = match self.transport.recv() {
            Ok(frame) => frame,
            Err(FrameError::OversizedFrame {
                sequence,
                size,
                max,
            }) => {
                warn!(sequence, size, max, "request exceeds frame limit");
                let response = Response::error(format!(
                    "request of {size} bytes exceeds the {max}-byte frame limit"
                ));
                let status = self.respond(sequence, response)?;
                return Ok(DispatchReport {
                    sequence,
                    function: None,
                    status,
                });
            }
            Err(err) => return Err(err.into()),
        };
        let sequence = frame.sequence;

        let (function, response) = self.handle(&frame.payload);
        let status = self.respond(sequence, response)?;

        debug!(
            sequence,
            function = function.as_deref().unwrap_or("-"),
            %status,
            "dispatched"
        );
        Ok(DispatchReport {
            sequence,
            function,
            status,
        })
    }

    /// Dispatch until the peer disconnects. Returns the number of requests
    /// answered.
    pub fn serve(&mut self) -> Result<u64> {
        let mut served = 0u64;
        loop {
            match self.dispatch_once() {
                Ok(_) => served += 1,
                Err(err) if err.is_disconnect() => {
                    debug!(served, "peer disconnected");
                    return Ok(served);
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn close(&mut self) -> Result<()> {
        self.transport.close()?;
        Ok(())
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn transport(&self) -> &FramedTransport<S> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut FramedTransport<S> {
        &mut self.transport
    }

    pub fn into_transport(self) -> FramedTransport<S> {
        self.transport
    }

    fn handle(&self, blob: &[u8]) -> (Option<String>, Response) {
        let value = match self.codec.decode(blob) {
            Ok(value) => value,
            Err(err) => {
                return (
                    None,
                    Response::error(format!("could not decode request: {err}")),
                )
            }
        };

        let request = match Request::from_value(value) {
            Ok(request) => request,
            Err(err) => return (None, Response::error(format!("malformed request: {err}"))),
        };

        let response = match self.functions.get(&request.function) {
            Some(handler) => invoke(handler, &request.function, &request.args),
            None => Response::error(format!("unknown function '{}'", request.function)),
        };
        (Some(request.function), response)
    }

    fn respond(&mut self, sequence: u32, response: Response) -> Result<Status> {
        let status = response.status;
        let max = self.transport.config().max_payload_size;

        let encoded = self
            .codec
            .encode(&response.into_value())
            .map_err(|err| err.to_string())
            .and_then(|blob| {
                if blob.len() > max {
                    Err(format!(
                        "response of {} bytes exceeds the {max}-byte frame limit",
                        blob.len()
                    ))
                } else {
                    Ok(blob)
                }
            });

        let (status, blob) = match encoded {
            Ok(blob) => (status, blob),
            Err(reason) => {
                warn!(sequence, %reason, "could not encode response; sending error instead");
                let fallback = Response::error(format!("could not encode response: {reason}"));
                (Status::Error, self.codec.encode(&fallback.into_value())?)
            }
        };

        self.transport.send(&blob, Some(sequence))?;
        Ok(status)
    }
}

impl<S, C> std::fmt::Debug for Dispatcher<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("transport", &self.transport)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

fn invoke(handler: &dyn Handler, function: &str, args: &[Value]) -> Response {
    match catch_unwind(AssertUnwindSafe(|| handler.call(args))) {
        Ok(Ok(value)) => Response::ok(value),
        Ok(Err(CallError::Exception(message))) => Response::exception(message),
        Ok(Err(err)) => Response::error(format!("{function}: {err}")),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(function, %message, "handler panicked");
            Response::exception(format!("{function} panicked: {message}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
