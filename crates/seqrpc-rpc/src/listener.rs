use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use seqrpc_codec::Codec;
use seqrpc_frame::{FrameConfig, FramedTransport};
use seqrpc_transport::{Endpoint, Listener, SocketStream};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::function::FunctionTable;

/// Accepts connections and hands each one a [`Dispatcher`] over a shared
/// [`FunctionTable`].
pub struct RpcListener {
    listener: Listener,
    functions: Arc<FunctionTable>,
    frame_config: FrameConfig,
    running: Arc<AtomicBool>,
    next_connection_id: AtomicU64,
}

impl RpcListener {
    /// Bind to an endpoint.
    pub fn bind(endpoint: &Endpoint, functions: impl Into<Arc<FunctionTable>>) -> Result<Self> {
        let listener = Listener::bind(endpoint)?;
        Ok(Self {
            listener,
            functions: functions.into(),
            frame_config: FrameConfig::default(),
            running: Arc::new(AtomicBool::new(true)),
            next_connection_id: AtomicU64::new(1),
        })
    }

    /// Override frame config for accepted connections.
    pub fn with_frame_config(mut self, config: FrameConfig) -> Self {
        self.frame_config = config;
        self
    }

    /// Accept the next connection.
    pub fn accept<C: Codec<Value>>(&self, codec: C) -> Result<Dispatcher<SocketStream, C>> {
        let stream = self.listener.accept()?;
        let transport = FramedTransport::with_config_socket(stream, self.frame_config.clone())?;
        Ok(Dispatcher::new(transport, codec, self.functions.clone()))
    }

    /// Accept connections until [`ShutdownHandle::shutdown`] is called,
    /// serving each on its own thread. Returns the number of connections
    /// accepted.
    ///
    /// Connection threads are detached; they end when their peer
    /// disconnects.
    pub fn serve_forever<C>(&self, codec: C) -> Result<u64>
    where
        C: Codec<Value> + Clone + Send + 'static,
    {
        let mut accepted = 0u64;
        while self.running.load(Ordering::SeqCst) {
            let mut dispatcher = self.accept(codec.clone())?;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
            let peer = dispatcher.transport().get_ref().peer_label().to_string();
            info!(connection = id, %peer, "connection opened");

            thread::Builder::new()
                .name(format!("seqrpc-conn-{id}"))
                .spawn(move || match dispatcher.serve() {
                    Ok(served) => info!(connection = id, served, "connection closed"),
                    Err(err) => warn!(connection = id, error = %err, "connection failed"),
                })
                .map_err(seqrpc_transport::TransportError::Io)?;
            accepted += 1;
        }
        debug!(accepted, "accept loop stopped");
        Ok(accepted)
    }

    /// A handle that stops [`serve_forever`](Self::serve_forever) from
    /// another thread (or a signal handler).
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        Ok(ShutdownHandle {
            running: self.running.clone(),
            endpoint: wake_endpoint(self.listener.local_endpoint()?),
        })
    }

    /// The endpoint actually bound (with the OS-assigned port for `:0`).
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        Ok(self.listener.local_endpoint()?)
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }
}

impl std::fmt::Debug for RpcListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcListener")
            .field("listener", &self.listener)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

/// Stops an [`RpcListener`]'s accept loop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    endpoint: Endpoint,
}

impl ShutdownHandle {
    /// Clear the running flag and wake the blocked `accept` with a
    /// throwaway connection.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            let _ = SocketStream::connect(&self.endpoint);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }
}

/// Where the wake-up connection goes. A wildcard bind address is not
/// connectable everywhere, so it is swapped for loopback of the same family.
fn wake_endpoint(endpoint: Endpoint) -> Endpoint {
    let Endpoint::Tcp(addr) = &endpoint else {
        return endpoint;
    };
    match addr.parse::<SocketAddr>() {
        Ok(mut addr) if addr.ip().is_unspecified() => {
            let loopback = match addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            };
            addr.set_ip(loopback);
            Endpoint::Tcp(addr.to_string())
        }
        _ => endpoint,
    }
}

#[cfg(test)]
mod tests {
    use seqrpc_codec::{CodecKind, JsonCodec};
    use serde_json::json;

    use super::*;
    use crate::connector::connect;

    fn table() -> FunctionTable {
        FunctionTable::builder()
            .typed("add", |(a, b): (i64, i64)| Ok::<_, String>(a + b))
            .build()
            .unwrap()
    }

    #[test]
    fn accept_returns_dispatcher() {
        let listener = RpcListener::bind(&"tcp://127.0.0.1:0".parse().unwrap(), table())
            .expect("listener should bind");
        let endpoint = listener.local_endpoint().unwrap();

        let server = thread::spawn(move || {
            let mut dispatcher = listener.accept(JsonCodec).expect("listener should accept");
            assert!(dispatcher.functions().contains("add"));
            dispatcher.dispatch_once().expect("one request should be served")
        });

        let mut client = connect(&endpoint, JsonCodec).expect("client should connect");
        assert_eq!(client.call("add", vec![json!(8), json!(4)]).unwrap(), json!(12));
        let report = server.join().expect("server thread should finish");
        assert_eq!(report.function.as_deref(), Some("add"));
    }

    #[test]
    fn serve_forever_handles_concurrent_clients_and_stops() {
        let listener = RpcListener::bind(&"tcp://127.0.0.1:0".parse().unwrap(), table())
            .expect("listener should bind");
        let endpoint = listener.local_endpoint().unwrap();
        let shutdown = listener.shutdown_handle().unwrap();

        let codec: Arc<dyn Codec<Value> + Send + Sync> = Arc::from(CodecKind::JsonGzip.build());
        let server_codec = codec.clone();
        let server = thread::spawn(move || listener.serve_forever(server_codec));

        let clients: Vec<_> = (0..4i64)
            .map(|n| {
                let endpoint = endpoint.clone();
                let codec = codec.clone();
                thread::spawn(move || {
                    let mut client = connect(&endpoint, codec).expect("client should connect");
                    let sum = client.call("add", vec![json!(n), json!(100)]).unwrap();
                    assert_eq!(sum, json!(n + 100));
                })
            })
            .collect();
        for client in clients {
            client.join().expect("client thread should finish");
        }

        shutdown.shutdown();
        assert!(shutdown.is_shutdown());
        let accepted = server.join().expect("server thread should finish").unwrap();
        assert_eq!(accepted, 4);
    }

    #[test]
    fn wildcard_bind_wakes_through_loopback() {
        assert_eq!(
            wake_endpoint(Endpoint::Tcp("0.0.0.0:7000".into())),
            Endpoint::Tcp("127.0.0.1:7000".into())
        );
        assert_eq!(
            wake_endpoint(Endpoint::Tcp("[::]:7000".into())),
            Endpoint::Tcp("[::1]:7000".into())
        );
        assert_eq!(
            wake_endpoint(Endpoint::Tcp("10.1.2.3:7000".into())),
            Endpoint::Tcp("10.1.2.3:7000".into())
        );
        let unix = Endpoint::Unix("/tmp/seqrpc.sock".into());
        assert_eq!(wake_endpoint(unix.clone()), unix);
    }

    #[test]
    fn shutdown_stops_wildcard_listener() {
        let listener = RpcListener::bind(&"tcp://0.0.0.0:0".parse().unwrap(), table())
            .expect("listener should bind");
        let shutdown = listener.shutdown_handle().unwrap();
        let server = thread::spawn(move || listener.serve_forever(JsonCodec));

        shutdown.shutdown();
        let accepted = server.join().expect("server thread should finish").unwrap();
        assert_eq!(accepted, 0);
    }

    #[cfg(unix)]
    #[test]
    fn unix_endpoint() {
        let dir = std::env::temp_dir().join(format!(
            "seqrpc-listener-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let endpoint = Endpoint::Unix(dir.join("rpc.sock"));

        let listener = RpcListener::bind(&endpoint, table()).expect("listener should bind");
        let server = thread::spawn(move || {
            let mut dispatcher = listener.accept(JsonCodec).expect("listener should accept");
            dispatcher.serve().expect("serve should end cleanly")
        });

        let mut client = connect(&endpoint, JsonCodec).expect("client should connect");
        assert_eq!(client.call("add", vec![json!(1), json!(2)]).unwrap(), json!(3));
        client.close().unwrap();
        assert_eq!(server.join().expect("server thread should finish"), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
