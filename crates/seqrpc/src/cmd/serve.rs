use std::io::Write;
use std::sync::Arc;

use seqrpc_codec::Codec;
use seqrpc_rpc::{RpcListener, ShutdownHandle};
use serde_json::Value;
use tracing::info;

use crate::builtins;
use crate::cmd::ServeArgs;
use crate::exit::{rpc_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let functions =
        builtins::table().map_err(|err| rpc_error("function registration failed", err))?;
    let listener = RpcListener::bind(&args.endpoint, functions)
        .map_err(|err| rpc_error("bind failed", err))?;
    let endpoint = listener
        .local_endpoint()
        .map_err(|err| rpc_error("bind failed", err))?;

    let shutdown = listener
        .shutdown_handle()
        .map_err(|err| rpc_error("bind failed", err))?;
    install_ctrlc_handler(shutdown)?;

    info!(
        %endpoint,
        codec = %args.codec,
        functions = listener.functions().len(),
        "serving"
    );
    // The bound endpoint goes to stdout so callers can discover an OS-assigned port.
    let mut stdout = std::io::stdout();
    let _ = writeln!(stdout, "{endpoint}");
    let _ = stdout.flush();

    let codec: Arc<dyn Codec<Value> + Send + Sync> = Arc::from(args.codec.build());
    let accepted = listener
        .serve_forever(codec)
        .map_err(|err| rpc_error("accept failed", err))?;

    info!(accepted, "server stopped");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(shutdown: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || shutdown.shutdown()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
