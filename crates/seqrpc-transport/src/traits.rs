use std::io::{ErrorKind, Read, Write};

use bytes::{Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Largest slice handed to a single `read`/`write` call on the underlying channel.
pub const MAX_CHUNK: usize = 16 * 1024;

/// An ordered, reliable, blocking duplex byte channel.
///
/// Implementations absorb short reads and partial writes; callers only ever
/// see complete transfers, an end-of-stream fault, or an I/O fault.
pub trait ByteStream {
    /// Block until exactly `n` bytes are available and return them.
    ///
    /// Fails with [`TransportError::EndOfStream`] if the peer closes first.
    fn recv_exact(&mut self, n: usize) -> Result<Bytes>;

    /// Block until every byte of `data` has been accepted by the channel.
    fn send_all(&mut self, data: &[u8]) -> Result<()>;

    /// Shut the channel down. Calling this more than once is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Whether [`close`](ByteStream::close) has been called.
    fn is_closed(&self) -> bool;
}

impl<S: ByteStream + ?Sized> ByteStream for Box<S> {
    fn recv_exact(&mut self, n: usize) -> Result<Bytes> {
        (**self).recv_exact(n)
    }

    fn send_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).send_all(data)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// Adapts any `Read + Write` object (pipes, in-memory buffers, wrapped
/// sockets) into a [`ByteStream`].
///
/// Closing drops the wrapped object after a best-effort flush.
pub struct IoStream<T> {
    inner: Option<T>,
}

impl<T: Read + Write> IoStream<T> {
    pub fn new(inner: T) -> Self {
        Self { inner: Some(inner) }
    }

    /// Borrow the wrapped object, or `None` once closed.
    pub fn get_ref(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    /// Mutably borrow the wrapped object, or `None` once closed.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.inner.as_mut()
    }

    /// Consume the adapter and return the wrapped object, or `None` once closed.
    pub fn into_inner(self) -> Option<T> {
        self.inner
    }
}

impl<T: Read + Write> ByteStream for IoStream<T> {
    fn recv_exact(&mut self, n: usize) -> Result<Bytes> {
        let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
        read_exact_chunked(inner, n)
    }

    fn send_all(&mut self, data: &[u8]) -> Result<()> {
        let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
        write_all_chunked(inner, data)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut inner) = self.inner.take() {
            let _ = inner.flush();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl<T> std::fmt::Debug for IoStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoStream")
            .field("closed", &self.inner.is_none())
            .finish()
    }
}

pub(crate) fn read_exact_chunked<R: Read + ?Sized>(reader: &mut R, n: usize) -> Result<Bytes> {
    let mut buf = BytesMut::zeroed(n);
    let mut filled = 0usize;

    while filled < n {
        let end = n.min(filled + MAX_CHUNK);
        match reader.read(&mut buf[filled..end]) {
            Ok(0) => return Err(TransportError::EndOfStream),
            Ok(read) => filled += read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(classify_io_error(err)),
        }
    }

    Ok(buf.freeze())
}

pub(crate) fn write_all_chunked<W: Write + ?Sized>(writer: &mut W, data: &[u8]) -> Result<()> {
    let mut offset = 0usize;

    while offset < data.len() {
        let end = data.len().min(offset + MAX_CHUNK);
        match writer.write(&data[offset..end]) {
            Ok(0) => return Err(TransportError::EndOfStream),
            Ok(sent) => offset += sent,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(classify_io_error(err)),
        }
    }

    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(classify_io_error(err)),
        }
    }
}

/// Map I/O errors that mean "the peer is gone" onto [`TransportError::EndOfStream`].
pub(crate) fn classify_io_error(err: std::io::Error) -> TransportError {
    match err.kind() {
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe => TransportError::EndOfStream,
        _ => TransportError::Io(err),
    }
}
