use clap::{Args, Subcommand};
use seqrpc_codec::CodecKind;
use seqrpc_transport::Endpoint;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the built-in diagnostic functions.
    Serve(ServeArgs),
    /// Call one function and print its result.
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Call(args) => call::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Endpoint to bind (tcp://host:port, unix:///path, host:port, or a path).
    pub endpoint: Endpoint,
    /// Codec for request and response envelopes.
    #[arg(long, env = "SEQRPC_CODEC", default_value = "json")]
    pub codec: CodecKind,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Endpoint to connect to.
    pub endpoint: Endpoint,
    /// Function name.
    pub function: String,
    /// Arguments as a JSON array, e.g. '[8, 4]'. Default: no arguments.
    pub args: Option<String>,
    /// Codec for request and response envelopes; must match the server.
    #[arg(long, env = "SEQRPC_CODEC", default_value = "json")]
    pub codec: CodecKind,
    /// Maximum time to wait on the socket (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
