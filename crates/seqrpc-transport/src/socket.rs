use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::traits::{read_exact_chunked, write_all_chunked, ByteStream};

/// A connected socket: TCP, or a Unix domain socket on Unix platforms.
///
/// Once closed, the underlying socket is shut down in both directions and
/// released; every later operation fails with [`TransportError::Closed`].
pub struct SocketStream {
    inner: Option<SocketInner>,
    peer: String,
}

enum SocketInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl SocketInner {
    fn io(&mut self) -> &mut dyn ReadWrite {
        match self {
            SocketInner::Tcp(stream) => stream,
            #[cfg(unix)]
            SocketInner::Unix(stream) => stream,
        }
    }

    fn shutdown(&self) -> std::io::Result<()> {
        match self {
            SocketInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            SocketInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

trait ReadWrite: Read + Write {}

impl<T: Read + Write> ReadWrite for T {}

impl SocketStream {
    /// Wrap an already-connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        let peer = stream
            .peer_addr()
            .map(|addr| format!("tcp://{addr}"))
            .unwrap_or_else(|_| "tcp://<unknown>".to_string());
        Self {
            inner: Some(SocketInner::Tcp(stream)),
            peer,
        }
    }

    /// Wrap an already-connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        let peer = stream
            .peer_addr()
            .ok()
            .and_then(|addr| addr.as_pathname().map(|p| format!("unix://{}", p.display())))
            .unwrap_or_else(|| "unix://<unnamed>".to_string());
        Self {
            inner: Some(SocketInner::Unix(stream)),
            peer,
        }
    }

    /// Create a connected pair of Unix domain sockets.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Connect to a listening endpoint (blocking).
    pub fn connect(endpoint: &Endpoint) -> Result<Self> {
        let connect_err = |source| TransportError::Connect {
            endpoint: endpoint.to_string(),
            source,
        };

        let stream = match endpoint {
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).map_err(connect_err)?;
                let _ = stream.set_nodelay(true);
                Self::from_tcp(stream)
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream =
                    std::os::unix::net::UnixStream::connect(path).map_err(connect_err)?;
                let mut stream = Self::from_unix(stream);
                stream.peer = endpoint.to_string();
                stream
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(connect_err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "unix domain sockets are not available on this platform",
                )))
            }
        };

        debug!(%endpoint, "connected");
        Ok(stream)
    }

    /// Set the read timeout on the underlying socket.
    ///
    /// An expired timeout surfaces as [`TransportError::Io`].
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match self.inner.as_ref().ok_or(TransportError::Closed)? {
            SocketInner::Tcp(stream) => stream.set_read_timeout(timeout)?,
            #[cfg(unix)]
            SocketInner::Unix(stream) => stream.set_read_timeout(timeout)?,
        }
        Ok(())
    }

    /// Set the write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match self.inner.as_ref().ok_or(TransportError::Closed)? {
            SocketInner::Tcp(stream) => stream.set_write_timeout(timeout)?,
            #[cfg(unix)]
            SocketInner::Unix(stream) => stream.set_write_timeout(timeout)?,
        }
        Ok(())
    }

    /// Human-readable description of the remote side, for diagnostics.
    pub fn peer_label(&self) -> &str {
        &self.peer
    }
}

impl ByteStream for SocketStream {
    fn recv_exact(&mut self, n: usize) -> Result<Bytes> {
        let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
        read_exact_chunked(inner.io(), n)
    }

    fn send_all(&mut self, data: &[u8]) -> Result<()> {
        let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
        write_all_chunked(inner.io(), data)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(inner) = self.inner.take() {
            // The peer may already be gone; shutdown failure is expected then.
            if let Err(err) = inner.shutdown() {
                debug!(peer = %self.peer, error = %err, "shutdown on close failed");
            }
            debug!(peer = %self.peer, "stream closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl std::fmt::Debug for SocketStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            Some(SocketInner::Tcp(_)) => "tcp",
            #[cfg(unix)]
            Some(SocketInner::Unix(_)) => "unix",
            None => "closed",
        };
        f.debug_struct("SocketStream")
            .field("type", &kind)
            .field("peer", &self.peer)
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn pair_moves_bytes_both_ways() {
        let (mut left, mut right) = SocketStream::pair().unwrap();

        left.send_all(b"ping").unwrap();
        assert_eq!(right.recv_exact(4).unwrap().as_ref(), b"ping");

        right.send_all(b"pong").unwrap();
        assert_eq!(left.recv_exact(4).unwrap().as_ref(), b"pong");
    }

    #[test]
    fn large_transfer_spans_many_chunks() {
        let (mut left, mut right) = SocketStream::pair().unwrap();
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        let expected = payload.clone();
        let reader = std::thread::spawn(move || right.recv_exact(expected.len()).unwrap());

        left.send_all(&payload).unwrap();
        let received = reader.join().unwrap();
        assert_eq!(received.as_ref(), payload.as_slice());
    }

    #[test]
    fn peer_close_is_end_of_stream() {
        let (mut left, mut right) = SocketStream::pair().unwrap();
        left.send_all(b"ab").unwrap();
        left.close().unwrap();

        let err = right.recv_exact(3).unwrap_err();
        assert!(matches!(err, TransportError::EndOfStream));
    }

    #[test]
    fn operations_after_close_fail_with_closed() {
        let (mut left, _right) = SocketStream::pair().unwrap();
        left.close().unwrap();
        left.close().unwrap();

        assert!(left.is_closed());
        assert!(matches!(left.recv_exact(1), Err(TransportError::Closed)));
        assert!(matches!(left.send_all(b"x"), Err(TransportError::Closed)));
        assert!(matches!(
            left.set_read_timeout(None),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn read_timeout_surfaces_as_io_error() {
        let (mut left, _right) = SocketStream::pair().unwrap();
        left.set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let err = left.recv_exact(1).unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[test]
    fn tcp_connect_to_closed_port_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::Tcp(addr.to_string());
        let err = SocketStream::connect(&endpoint).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
