//! JSON I/O handling for CLI
//!
//! - Input: one JSON object of request parameters via stdin
//! - Output: one JSON object via stdout

use std::collections::HashMap;
use std::io::{self, Read, Write};

use serde::Serialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read request parameters from stdin
pub fn read_params() -> CliResult<HashMap<String, String>> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;

    if input.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    let value: Value = serde_json::from_str(&input)?;
    params_from_value(&value)
}

/// Flatten a JSON object into request parameters.
///
/// Scalars are rendered as strings, arrays of scalars are joined with
/// commas and nulls are dropped.
pub fn params_from_value(value: &Value) -> CliResult<HashMap<String, String>> {
    let obj = value
        .as_object()
        .ok_or_else(|| CliError::io_error("Request must be a JSON object"))?;

    let mut params = HashMap::with_capacity(obj.len());
    for (key, value) in obj {
        let rendered = match value {
            Value::Null => continue,
            Value::Array(items) => items
                .iter()
                .map(|item| scalar(key, item))
                .collect::<CliResult<Vec<_>>>()?
                .join(","),
            other => scalar(key, other)?,
        };
        params.insert(key.clone(), rendered);
    }
    Ok(params)
}

fn scalar(key: &str, value: &Value) -> CliResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(CliError::io_error(format!(
            "Parameter '{}' must be a string, number, boolean or array of those",
            key
        ))),
    }
}

/// Write a value as one JSON line to stdout
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
