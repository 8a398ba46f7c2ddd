use std::fmt;
use std::net::TcpListener;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::socket::SocketStream;

/// Where a listener binds or a client connects.
///
/// Parsed from `tcp://host:port`, `unix:///path/to.sock`, a bare `host:port`,
/// or a bare filesystem path (anything containing `/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    Unix(PathBuf),
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self> {
        let input = input.trim();
        if let Some(addr) = input.strip_prefix("tcp://") {
            if addr.is_empty() {
                return Err(TransportError::InvalidEndpoint(input.to_string()));
            }
            return Ok(Self::Tcp(addr.to_string()));
        }
        if let Some(path) = input.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(TransportError::InvalidEndpoint(input.to_string()));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if input.contains('/') {
            return Ok(Self::Unix(PathBuf::from(input)));
        }
        if input.rsplit_once(':').is_some_and(|(_, port)| port.parse::<u16>().is_ok()) {
            return Ok(Self::Tcp(input.to_string()));
        }
        Err(TransportError::InvalidEndpoint(input.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Accepts incoming connections on an [`Endpoint`].
///
/// Unix listeners remove a stale socket file before binding (never a
/// non-socket file) and remove their own socket file on drop, unless the
/// path was replaced in the meantime.
pub struct Listener {
    inner: ListenerInner,
    endpoint: Endpoint,
}

enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: std::os::unix::net::UnixListener,
        path: PathBuf,
        created_inode: (u64, u64),
    },
}

impl Listener {
    /// Default permission mode for created socket files.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on the endpoint.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        let inner = match endpoint {
            Endpoint::Tcp(addr) => {
                let listener =
                    TcpListener::bind(addr.as_str()).map_err(|source| TransportError::Bind {
                        endpoint: endpoint.to_string(),
                        source,
                    })?;
                ListenerInner::Tcp(listener)
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => bind_unix(endpoint, path)?,
            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(TransportError::Bind {
                    endpoint: endpoint.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        "unix domain sockets are not available on this platform",
                    ),
                })
            }
        };

        let listener = Self {
            inner,
            endpoint: endpoint.clone(),
        };
        info!(endpoint = %listener.local_endpoint()?, "listening");
        Ok(listener)
    }

    /// Accept the next connection (blocking).
    pub fn accept(&self) -> Result<SocketStream> {
        let stream = match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, _addr) = listener.accept().map_err(TransportError::Accept)?;
                let _ = stream.set_nodelay(true);
                SocketStream::from_tcp(stream)
            }
            #[cfg(unix)]
            ListenerInner::Unix { listener, .. } => {
                let (stream, _addr) = listener.accept().map_err(TransportError::Accept)?;
                SocketStream::from_unix(stream)
            }
        };
        debug!(peer = stream.peer_label(), "accepted connection");
        Ok(stream)
    }

    /// The endpoint actually bound. For `tcp://host:0` this carries the
    /// port the OS picked.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        match &self.inner {
            ListenerInner::Tcp(listener) => Ok(Endpoint::Tcp(listener.local_addr()?.to_string())),
            #[cfg(unix)]
            ListenerInner::Unix { .. } => Ok(self.endpoint.clone()),
        }
    }

    /// The endpoint this listener was asked to bind.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[cfg(unix)]
fn bind_unix(endpoint: &Endpoint, path: &std::path::Path) -> Result<ListenerInner> {
    use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};

    let bind_err = |source| TransportError::Bind {
        endpoint: endpoint.to_string(),
        source,
    };

    let path_len = path.as_os_str().len();
    if path_len >= Listener::MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len: path_len,
            max: Listener::MAX_PATH_LEN,
        });
    }

    if let Ok(metadata) = std::fs::symlink_metadata(path) {
        if !metadata.file_type().is_socket() {
            return Err(bind_err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "existing path is not a unix socket",
            )));
        }
        debug!(?path, "removing stale socket");
        std::fs::remove_file(path).map_err(bind_err)?;
    }

    let listener = std::os::unix::net::UnixListener::bind(path).map_err(bind_err)?;
    std::fs::set_permissions(
        path,
        std::fs::Permissions::from_mode(Listener::DEFAULT_SOCKET_MODE),
    )
    .map_err(bind_err)?;
    let metadata = std::fs::symlink_metadata(path).map_err(bind_err)?;

    Ok(ListenerInner::Unix {
        listener,
        path: path.to_path_buf(),
        created_inode: (metadata.dev(), metadata.ino()),
    })
}

impl Drop for Listener {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let ListenerInner::Unix {
            path,
            created_inode,
            ..
        } = &self.inner
        {
            use std::os::unix::fs::{FileTypeExt, MetadataExt};

            let Ok(metadata) = std::fs::symlink_metadata(path) else {
                return;
            };
            if metadata.file_type().is_socket()
                && (metadata.dev(), metadata.ino()) == *created_inode
            {
                debug!(?path, "removing socket file");
                let _ = std::fs::remove_file(path);
            } else {
                debug!(?path, "socket path replaced; leaving it in place");
            }
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::traits::ByteStream;

    use super::*;

    #[test]
    fn parses_endpoint_forms() {
        assert_eq!(
            "tcp://127.0.0.1:7000".parse::<Endpoint>().unwrap(),
            Endpoint::Tcp("127.0.0.1:7000".to_string())
        );
        assert_eq!(
            "localhost:9".parse::<Endpoint>().unwrap(),
            Endpoint::Tcp("localhost:9".to_string())
        );
        assert_eq!(
            "unix:///tmp/a.sock".parse::<Endpoint>().unwrap(),
            Endpoint::Unix(PathBuf::from("/tmp/a.sock"))
        );
        assert_eq!(
            "./rel.sock".parse::<Endpoint>().unwrap(),
            Endpoint::Unix(PathBuf::from("./rel.sock"))
        );
    }

    #[test]
    fn rejects_unparseable_endpoints() {
        for bad in ["", "tcp://", "unix://", "nohost", "host:notaport"] {
            let err = bad.parse::<Endpoint>().unwrap_err();
            assert!(matches!(err, TransportError::InvalidEndpoint(_)), "{bad}");
        }
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for input in ["tcp://10.0.0.1:80", "unix:///var/run/x.sock"] {
            let endpoint: Endpoint = input.parse().unwrap();
            assert_eq!(endpoint.to_string(), input);
        }
    }

    #[test]
    fn tcp_bind_accept_connect() {
        let listener = Listener::bind(&"tcp://127.0.0.1:0".parse().unwrap()).unwrap();
        let endpoint = listener.local_endpoint().unwrap();

        let client = std::thread::spawn(move || {
            let mut stream = SocketStream::connect(&endpoint).unwrap();
            stream.send_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        assert_eq!(server.recv_exact(5).unwrap().as_ref(), b"hello");
        client.join().unwrap();
    }

    #[cfg(unix)]
    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "seqrpc-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[cfg(unix)]
    #[test]
    fn unix_bind_accept_connect_and_cleanup() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_dir("uds");
        let sock_path = dir.join("test.sock");
        let endpoint = Endpoint::Unix(sock_path.clone());

        let listener = Listener::bind(&endpoint).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, Listener::DEFAULT_SOCKET_MODE);

        let connect_to = endpoint.clone();
        let client = std::thread::spawn(move || {
            let mut stream = SocketStream::connect(&connect_to).unwrap();
            stream.send_all(b"uds").unwrap();
        });

        let mut server = listener.accept().unwrap();
        assert_eq!(server.recv_exact(3).unwrap().as_ref(), b"uds");
        client.join().unwrap();

        drop(listener);
        assert!(!sock_path.exists(), "socket file should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn unix_bind_rejects_regular_file() {
        let dir = temp_dir("uds-file");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular").unwrap();

        let result = Listener::bind(&Endpoint::Unix(sock_path.clone()));
        assert!(matches!(result, Err(TransportError::Bind { .. })));
        assert!(sock_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn unix_bind_replaces_stale_socket() {
        let dir = temp_dir("uds-stale");
        let sock_path = dir.join("stale.sock");
        let endpoint = Endpoint::Unix(sock_path.clone());

        let first = Listener::bind(&endpoint).unwrap();
        std::mem::forget(first);
        assert!(sock_path.exists());

        let second = Listener::bind(&endpoint);
        assert!(second.is_ok());
        drop(second);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn unix_path_too_long() {
        let long = PathBuf::from(format!("/tmp/{}.sock", "a".repeat(200)));
        let result = Listener::bind(&Endpoint::Unix(long));
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }
}
