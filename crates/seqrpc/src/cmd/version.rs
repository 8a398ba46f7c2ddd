use seqrpc_codec::CodecKind;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("seqrpc {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let codecs: Vec<&str> = CodecKind::ALL.iter().map(|kind| kind.as_str()).collect();

    println!("name: seqrpc");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("SEQRPC_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("codecs: {}", codecs.join(", "));
    println!("unix_sockets: {}", cfg!(unix));

    Ok(SUCCESS)
}
