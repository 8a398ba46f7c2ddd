use std::time::{Duration, Instant};

use seqrpc_frame::FrameConfig;
use seqrpc_rpc::{connect_with_config, InvokerConfig};
use serde_json::Value;

use crate::cmd::CallArgs;
use crate::exit::{rpc_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_call_result, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let call_args = parse_call_args(args.args.as_deref())?;

    let frame_config = FrameConfig {
        read_timeout: Some(timeout),
        write_timeout: Some(timeout),
        ..FrameConfig::default()
    };
    let mut invoker = connect_with_config(
        &args.endpoint,
        args.codec.build(),
        frame_config,
        InvokerConfig::default(),
    )
    .map_err(|err| rpc_error("connect failed", err))?;

    let started = Instant::now();
    let result = invoker
        .call(&args.function, call_args)
        .map_err(|err| rpc_error("call failed", err))?;
    let elapsed = started.elapsed();
    let _ = invoker.close();

    print_call_result(
        &args.endpoint.to_string(),
        &args.function,
        &result,
        elapsed,
        format,
    );
    Ok(SUCCESS)
}

fn parse_call_args(input: Option<&str>) -> CliResult<Vec<Value>> {
    let Some(input) = input else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Value>(input) {
        Ok(Value::Array(args)) => Ok(args),
        Ok(_) => Err(CliError::new(USAGE, "ARGS must be a JSON array, e.g. '[8, 4]'")),
        Err(err) => Err(CliError::new(USAGE, format!("ARGS is not valid JSON: {err}"))),
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
