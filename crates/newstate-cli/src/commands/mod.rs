//! Subcommand implementations.

pub mod exec;
pub mod run;

use anyhow::anyhow;
use mlua::{Lua, Value};
use newstate::{codes, BridgeError};

/// Turn a command-line word into a Lua value.
///
/// `nil`, `true` and `false` map to themselves, numbers keep their integer
/// or float subtype, and anything else is passed as a string.
pub fn parse_arg(lua: &Lua, word: &str) -> mlua::Result<Value> {
    let value = match word {
        "nil" => Value::Nil,
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => {
            if let Ok(i) = word.parse::<i64>() {
                Value::Integer(i)
            } else if let Some(n) = parse_float(word) {
                Value::Number(n)
            } else {
                Value::String(lua.create_string(word)?)
            }
        }
    };
    Ok(value)
}

fn parse_float(word: &str) -> Option<f64> {
    // Keeps "inf" and "nan" as strings
    if !word.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    word.parse::<f64>().ok()
}

/// `message (STATUS)` for a failed bridge call
pub fn describe(err: &BridgeError) -> anyhow::Error {
    let payload = err.payload();
    match codes::status_name(payload.code) {
        Some(name) => anyhow!("{} ({})", payload.message, name),
        None => anyhow!("{} (code {})", payload.message, payload.code),
    }
}

/// Flatten an engine error into its message
pub fn lua_error(err: mlua::Error) -> anyhow::Error {
    anyhow!("{}", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg() {
        let lua = Lua::new();
        assert!(parse_arg(&lua, "nil").unwrap().is_nil());
        assert_eq!(parse_arg(&lua, "true").unwrap().as_boolean(), Some(true));
        assert!(matches!(parse_arg(&lua, "42").unwrap(), Value::Integer(42)));
        assert!(matches!(parse_arg(&lua, "-1.5").unwrap(), Value::Number(n) if n == -1.5));
        assert!(matches!(parse_arg(&lua, "1e3").unwrap(), Value::Number(_)));
        assert!(matches!(parse_arg(&lua, "inf").unwrap(), Value::String(_)));
        assert!(matches!(parse_arg(&lua, "hello").unwrap(), Value::String(_)));
    }

    #[test]
    fn test_describe() {
        let err = describe(&BridgeError::NoEntryPoint);
        assert_eq!(err.to_string(), "no entry point loaded (ERRNOENTRY)");
    }
}
