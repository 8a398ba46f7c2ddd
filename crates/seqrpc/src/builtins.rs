//! Diagnostic functions served by `seqrpc serve`.

use std::thread;
use std::time::Duration;

use seqrpc_rpc::{CallError, FunctionTable, Result};
use serde_json::{Number, Value};

/// Longest sleep `sleep_ms` will honor.
const MAX_SLEEP_MS: u64 = 60_000;

pub fn table() -> Result<FunctionTable> {
    FunctionTable::builder()
        .typed("ping", |(): ()| Ok::<_, String>("pong"))
        .register("echo", echo)
        .register("add", |args: &[Value]| {
            arithmetic(args, i64::checked_add, |a, b| a + b)
        })
        .register("mul", |args: &[Value]| {
            arithmetic(args, i64::checked_mul, |a, b| a * b)
        })
        .register("concat", concat)
        .typed("fail", |(message,): (String,)| Err::<(), _>(message))
        .typed("sleep_ms", |(ms,): (u64,)| {
            if ms > MAX_SLEEP_MS {
                return Err(format!("refusing to sleep longer than {MAX_SLEEP_MS}ms"));
            }
            thread::sleep(Duration::from_millis(ms));
            Ok(ms)
        })
        .build()
}

fn echo(args: &[Value]) -> std::result::Result<Value, CallError> {
    Ok(Value::Array(args.to_vec()))
}

fn concat(args: &[Value]) -> std::result::Result<Value, CallError> {
    let mut out = String::new();
    for (index, arg) in args.iter().enumerate() {
        match arg {
            Value::String(text) => out.push_str(text),
            _ => {
                return Err(CallError::InvalidArguments(format!(
                    "argument {index}: expected a string"
                )))
            }
        }
    }
    Ok(Value::String(out))
}

/// Integer arithmetic when both operands are integers, float otherwise.
fn arithmetic(
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> std::result::Result<Value, CallError> {
    let [a, b] = args else {
        return Err(CallError::InvalidArguments(format!(
            "expected 2 argument(s), got {}",
            args.len()
        )));
    };
    let (Value::Number(a), Value::Number(b)) = (a, b) else {
        return Err(CallError::InvalidArguments(
            "both arguments must be numbers".into(),
        ));
    };

    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return int_op(a, b)
            .map(Value::from)
            .ok_or_else(|| CallError::exception("integer overflow"));
    }

    let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) else {
        return Err(CallError::InvalidArguments("unsupported number".into()));
    };
    Number::from_f64(float_op(a, b))
        .map(Value::Number)
        .ok_or_else(|| CallError::exception("result is not a finite number"))
}
