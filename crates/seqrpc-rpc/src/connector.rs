use seqrpc_codec::Codec;
use seqrpc_frame::{FrameConfig, FramedTransport};
use seqrpc_transport::{Endpoint, SocketStream};
use serde_json::Value;

use crate::error::Result;
use crate::invoker::{Invoker, InvokerConfig};

/// Connect to a listening endpoint as a client.
pub fn connect<C: Codec<Value>>(endpoint: &Endpoint, codec: C) -> Result<Invoker<SocketStream, C>> {
    connect_with_config(
        endpoint,
        codec,
        FrameConfig::default(),
        InvokerConfig::default(),
    )
}

/// Connect with explicit frame and invoker configuration.
///
/// Frame read/write timeouts are applied to the socket and surface as
/// transport faults from [`Invoker::await_response`].
pub fn connect_with_config<C: Codec<Value>>(
    endpoint: &Endpoint,
    codec: C,
    frame_config: FrameConfig,
    invoker_config: InvokerConfig,
) -> Result<Invoker<SocketStream, C>> {
    let stream = SocketStream::connect(endpoint)?;
    let transport = FramedTransport::with_config_socket(stream, frame_config)?;
    Ok(Invoker::with_config(transport, codec, invoker_config))
}
