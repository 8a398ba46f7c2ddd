use std::io::IsTerminal;
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
    Table,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CallOutput<'a> {
    endpoint: &'a str,
    function: &'a str,
    result: &'a Value,
    elapsed_ms: u128,
}

pub fn print_call_result(
    endpoint: &str,
    function: &str,
    result: &Value,
    elapsed: Duration,
    format: OutputFormat,
) {
    println!(
        "{}",
        render_call_result(endpoint, function, result, elapsed, format)
    );
}

fn render_call_result(
    endpoint: &str,
    function: &str,
    result: &Value,
    elapsed: Duration,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => {
            let out = CallOutput {
                endpoint,
                function,
                result,
                elapsed_ms: elapsed.as_millis(),
            };
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Pretty => {
            serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FUNCTION", "RESULT", "ELAPSED"])
                .add_row(vec![
                    function.to_string(),
                    value_preview(result),
                    format!("{}ms", elapsed.as_millis()),
                ]);
            table.to_string()
        }
    }
}

fn value_preview(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_output_is_one_line_with_result() {
        let line = render_call_result(
            "tcp://127.0.0.1:7000",
            "add",
            &json!(12),
            Duration::from_millis(3),
            OutputFormat::Json,
        );
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["result"], json!(12));
        assert_eq!(parsed["function"], json!("add"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn pretty_output_is_the_bare_value() {
        let text = render_call_result(
            "x",
            "echo",
            &json!({"a": 1}),
            Duration::ZERO,
            OutputFormat::Pretty,
        );
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn table_output_names_the_function() {
        let text = render_call_result(
            "x",
            "concat",
            &json!("ab"),
            Duration::ZERO,
            OutputFormat::Table,
        );
        assert!(text.contains("concat"));
        assert!(text.contains("ab"));
    }
}
