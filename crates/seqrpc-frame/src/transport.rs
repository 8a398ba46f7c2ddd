use bytes::BytesMut;
use seqrpc_transport::{ByteStream, SocketStream, TransportError, MAX_CHUNK};
use tracing::{debug, trace};

use crate::codec::{decode_header, encode_frame, Frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::sequence::SequenceCounter;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Turns a [`ByteStream`] into a sequence of discrete, sequence-numbered
/// messages.
///
/// The transport owns the connection's [`SequenceCounter`]; frames sent
/// without an explicit sequence draw the next value from it. Closing the
/// transport closes the stream.
pub struct FramedTransport<S> {
    stream: S,
    sequence: SequenceCounter,
    buf: BytesMut,
    config: FrameConfig,
}

impl<S: ByteStream> FramedTransport<S> {
    /// Create a framed transport with default configuration.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, FrameConfig::default())
    }

    /// Create a framed transport with explicit configuration.
    pub fn with_config(stream: S, config: FrameConfig) -> Self {
        Self {
            stream,
            sequence: SequenceCounter::new(),
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Replace the sequence counter, e.g. to start numbering at another origin.
    pub fn with_sequence(mut self, sequence: SequenceCounter) -> Self {
        self.sequence = sequence;
        self
    }

    /// Send one frame and return the sequence number it carried.
    ///
    /// With `sequence == None` the next value of the connection's counter is
    /// used; responses pass the request's sequence explicitly. Header and
    /// payload go out in a single write.
    pub fn send(&mut self, payload: &[u8], sequence: Option<u32>) -> Result<u32> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        let sequence = match sequence {
            Some(sequence) => sequence,
            None => self.sequence.next_sequence()?,
        };

        self.buf.clear();
        encode_frame(sequence, payload, &mut self.buf)?;
        self.stream.send_all(&self.buf)?;

        trace!(sequence, size = payload.len(), "frame sent");
        Ok(sequence)
    }

    /// Receive the next complete frame (blocking).
    ///
    /// End-of-stream during the header or the payload is returned unchanged
    /// as [`TransportError::EndOfStream`]. A frame whose declared length
    /// exceeds the configured maximum is never buffered: its payload is read
    /// and discarded in [`MAX_CHUNK`] pieces and
    /// [`FrameError::OversizedFrame`] is returned, leaving the stream
    /// positioned at the next header.
    pub fn recv(&mut self) -> Result<Frame> {
        let raw = self.stream.recv_exact(HEADER_SIZE)?;
        let raw: [u8; HEADER_SIZE] = raw
            .as_ref()
            .try_into()
            .map_err(|_| TransportError::EndOfStream)?;
        let header = decode_header(&raw);

        let length = header.length as usize;
        if length > self.config.max_payload_size {
            self.skip(length)?;
            debug!(sequence = header.sequence, size = length, "oversized frame skipped");
            return Err(FrameError::OversizedFrame {
                sequence: header.sequence,
                size: length,
                max: self.config.max_payload_size,
            });
        }

        let payload = self.stream.recv_exact(length)?;
        if payload.len() != length {
            return Err(TransportError::EndOfStream.into());
        }

        trace!(sequence = header.sequence, size = length, "frame received");
        Ok(Frame {
            sequence: header.sequence,
            payload,
        })
    }

    fn skip(&mut self, mut remaining: usize) -> Result<()> {
        while remaining > 0 {
            let n = remaining.min(MAX_CHUNK);
            if self.stream.recv_exact(n)?.len() != n {
                return Err(TransportError::EndOfStream.into());
            }
            remaining -= n;
        }
        Ok(())
    }

    /// Close the underlying stream.
    pub fn close(&mut self) -> Result<()> {
        self.stream.close()?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_closed()
    }

    /// The sequence number the next unsequenced `send` will use, if any remain.
    pub fn next_sequence(&self) -> Option<u32> {
        self.sequence.peek()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Consume the transport and return the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Update maximum payload size for subsequent sends and receives.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FramedTransport<SocketStream> {
    /// Create a framed transport over a socket and apply the configured timeouts.
    pub fn with_config_socket(stream: SocketStream, config: FrameConfig) -> Result<Self> {
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(stream, config))
    }
}

impl<S> std::fmt::Debug for FramedTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedTransport")
            .field("next_sequence", &self.sequence.peek())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
