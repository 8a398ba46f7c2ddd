use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use seqrpc_codec::{Codec, CodecError};
use seqrpc_frame::{FrameError, FramedTransport};
use seqrpc_transport::ByteStream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::{Request, Response, Status};
use crate::error::{Result, RpcError};

/// Default number of responses that may be buffered while another call is awaited.
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// Invoker behavior configuration.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Upper bound on buffered out-of-order responses.
    pub max_pending: usize,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

/// Why a response was consumed without reaching its caller.
#[derive(Debug, Clone, Copy)]
enum Lost {
    Overflow,
    Oversized { size: usize, max: usize },
}

/// Client side of a connection.
///
/// Several requests may be sent before any response is awaited; responses
/// may come back in any order. A response that arrives while a different
/// sequence is being awaited is buffered until its own sequence is awaited.
pub struct Invoker<S, C> {
    transport: FramedTransport<S>,
    codec: C,
    config: InvokerConfig,
    pending: HashMap<u32, Response>,
    in_flight: HashSet<u32>,
    abandoned: BTreeSet<u32>,
    lost: BTreeMap<u32, Lost>,
}

impl<S: ByteStream, C: Codec<Value>> Invoker<S, C> {
    pub fn new(transport: FramedTransport<S>, codec: C) -> Self {
        Self::with_config(transport, codec, InvokerConfig::default())
    }

    pub fn with_config(transport: FramedTransport<S>, codec: C, config: InvokerConfig) -> Self {
        Self {
            transport,
            codec,
            config,
            pending: HashMap::new(),
            in_flight: HashSet::new(),
            abandoned: BTreeSet::new(),
            lost: BTreeMap::new(),
        }
    }

    /// Encode and send a request; returns its sequence for a later
    /// [`await_response`](Self::await_response).
    pub fn send_request(&mut self, function: &str, args: Vec<Value>) -> Result<u32> {
        let blob = self.codec.encode(&Request::new(function, args).into_value())?;
        let sequence = self.transport.send(&blob, None)?;
        self.in_flight.insert(sequence);
        debug!(sequence, function, size = blob.len(), "request sent");
        Ok(sequence)
    }

    /// Block until the response for `sequence` is available.
    ///
    /// OK yields the payload. EXCEPTION yields [`RpcError::RemoteException`];
    /// ERROR and unrecognized statuses yield [`RpcError::Protocol`]. A
    /// response that cannot be decoded aborts the wait with a codec error.
    ///
    /// A response dropped on arrival is reported when its sequence is
    /// awaited: [`RpcError::PendingOverflow`] if the pending table was full,
    /// [`FrameError::OversizedFrame`] if it exceeded the frame limit.
    pub fn await_response(&mut self, sequence: u32) -> Result<Value> {
        if let Some(response) = self.pending.remove(&sequence) {
            self.in_flight.remove(&sequence);
            return interpret(response);
        }
        if let Some(lost) = self.lost.remove(&sequence) {
            return Err(self.lost_error(sequence, lost));
        }
        if !self.in_flight.contains(&sequence) {
            return Err(RpcError::UnknownSequence(sequence));
        }

        loop {
            let frame = match self.transport.recv() {
                Ok(frame) => frame,
                Err(FrameError::OversizedFrame {
                    sequence: got,
                    size,
                    max,
                }) => {
                    let lost = Lost::Oversized { size, max };
                    if got == sequence {
                        self.in_flight.remove(&sequence);
                        return Err(self.lost_error(sequence, lost));
                    }
                    self.record_lost(got, lost);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let value = self.codec.decode(&frame.payload)?;
            let response = Response::from_value(value)
                .map_err(|err| RpcError::Protocol(format!("malformed response: {err}")))?;

            if frame.sequence == sequence {
                self.in_flight.remove(&sequence);
                return interpret(response);
            }
            self.buffer(frame.sequence, response)?;
        }
    }

    /// `send_request` followed by `await_response`.
    pub fn call(&mut self, function: &str, args: Vec<Value>) -> Result<Value> {
        let sequence = self.send_request(function, args)?;
        self.await_response(sequence)
    }

    /// Call with serializable arguments and a deserializable result.
    ///
    /// `args` must serialize to a sequence (tuple, array, `Vec`) or to
    /// `null` for no arguments.
    pub fn call_typed<A, R>(&mut self, function: &str, args: A) -> Result<R>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let args = match serde_json::to_value(args)
            .map_err(|err| CodecError::Encode(err.to_string()))?
        {
            Value::Array(args) => args,
            Value::Null => Vec::new(),
            other => {
                return Err(RpcError::Protocol(format!(
                    "arguments must serialize to a sequence, got {}",
                    crate::envelope::kind_of(&other)
                )))
            }
        };
        let value = self.call(function, args)?;
        serde_json::from_value(value).map_err(|err| CodecError::Decode(err.to_string()).into())
    }

    /// Forget an in-flight call. A buffered response is dropped now; one
    /// that arrives later is discarded. Returns false if `sequence` was not
    /// outstanding.
    pub fn abandon(&mut self, sequence: u32) -> bool {
        if !self.in_flight.remove(&sequence) {
            return false;
        }
        if self.pending.remove(&sequence).is_none() {
            remember(&mut self.abandoned, sequence, self.config.max_pending);
        }
        debug!(sequence, "call abandoned");
        true
    }

    /// Responses buffered for calls not yet awaited.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Requests sent whose responses have not been consumed.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    pub fn close(&mut self) -> Result<()> {
        self.abandoned.clear();
        self.transport.close()?;
        Ok(())
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

    fn buffer(&mut self, sequence: u32, response: Response) -> Result<()> {
        if self.abandoned.remove(&sequence) {
            debug!(sequence, "discarding response for abandoned call");
            return Ok(());
        }
        if !self.in_flight.contains(&sequence) || self.pending.contains_key(&sequence) {
            warn!(sequence, "dropping unsolicited response");
            return Ok(());
        }
        if self.pending.len() >= self.config.max_pending {
            self.record_lost(sequence, Lost::Overflow);
            return Err(self.lost_error(sequence, Lost::Overflow));
        }
        debug!(sequence, "buffering out-of-order response");
        self.pending.insert(sequence, response);
        Ok(())
    }

    /// Retire an in-flight sequence whose response will never be delivered.
    fn record_lost(&mut self, sequence: u32, lost: Lost) {
        if self.abandoned.remove(&sequence) || !self.in_flight.remove(&sequence) {
            return;
        }
        warn!(sequence, ?lost, "response dropped");
        while self.lost.len() >= self.config.max_pending.max(1) {
            self.lost.pop_first();
        }
        self.lost.insert(sequence, lost);
    }

    fn lost_error(&self, sequence: u32, lost: Lost) -> RpcError {
        match lost {
            Lost::Overflow => RpcError::PendingOverflow {
                limit: self.config.max_pending,
            },
            Lost::Oversized { size, max } => FrameError::OversizedFrame {
                sequence,
                size,
                max,
            }
            .into(),
        }
    }
}

/// Insert into a bookkeeping set holding at most `limit` sequences,
/// evicting the oldest. An evicted sequence reads as unknown afterwards.
fn remember(set: &mut BTreeSet<u32>, sequence: u32, limit: usize) {
    while set.len() >= limit.max(1) {
        set.pop_first();
    }
    set.insert(sequence);
}

fn interpret(response: Response) -> Result<Value> {
    match response.status {
        Status::Ok => Ok(response.payload),
        Status::Exception => Err(RpcError::RemoteException(response.payload_text())),
        Status::Error => Err(RpcError::Protocol(response.payload_text())),
        Status::Unknown(code) => Err(RpcError::Protocol(format!(
            "unrecognized response status {code}"
        ))),
    }
}

impl<S, C> std::fmt::Debug for Invoker<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .field("in_flight", &self.in_flight.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
