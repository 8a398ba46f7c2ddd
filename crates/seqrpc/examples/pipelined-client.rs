//! Keeps several calls in flight on one connection.
//!
//! Starts an in-process server on an ephemeral TCP port, sends three
//! requests before reading any response, then collects the results in
//! reverse order.
//!
//! Run with: `cargo run -p seqrpc --example pipelined-client`

use std::thread;

use seqrpc::codec::JsonCodec;
use seqrpc::rpc::{connect, FunctionTable, RpcListener};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let functions = FunctionTable::builder()
        .typed("square", |(n,): (i64,)| Ok::<_, String>(n * n))
        .typed("greet", |(name,): (String,)| {
            Ok::<_, String>(format!("hello, {name}"))
        })
        .build()?;

    let listener = RpcListener::bind(&"tcp://127.0.0.1:0".parse()?, functions)?;
    let endpoint = listener.local_endpoint()?;
    let server = thread::spawn(move || -> seqrpc::rpc::Result<u64> {
        let mut dispatcher = listener.accept(JsonCodec)?;
        dispatcher.serve()
    });

    let mut invoker = connect(&endpoint, JsonCodec)?;
    let first = invoker.send_request("square", vec![json!(7)])?;
    let second = invoker.send_request("greet", vec![json!("seqrpc")])?;
    let third = invoker.send_request("square", vec![json!(-3)])?;
    println!("sent sequences {first}, {second}, {third}");

    for sequence in [third, second, first] {
        let value = invoker.await_response(sequence)?;
        println!("sequence {sequence} -> {value} ({} buffered)", invoker.pending_len());
    }

    invoker.close()?;
    let served = server.join().map_err(|_| "server thread panicked")??;
    println!("server answered {served} requests");
    Ok(())
}
