//! `newstate exec` / `newstate eval` - run one chunk in a fresh child state.

use std::path::PathBuf;

use mlua::{Lua, Value};
use newstate::{Bridge, BridgeOptions, Source};

use super::{describe, lua_error, parse_arg};
use crate::output::StyledOutput;

/// What to load into the child state
pub enum Chunk {
    File(PathBuf),
    Inline(String),
}

/// Load `chunk` into a new bridge, run it with `args` and print each result.
pub fn execute(
    chunk: Chunk,
    args: &[String],
    options: BridgeOptions,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let host = Lua::new();
    let results = evaluate(&host, &chunk, args, options)?;
    for value in &results {
        out.value(value);
    }
    out.flush();
    Ok(())
}

fn evaluate(
    host: &Lua,
    chunk: &Chunk,
    args: &[String],
    options: BridgeOptions,
) -> anyhow::Result<Vec<Value>> {
    let mut bridge = Bridge::with_options(options).map_err(|err| describe(&err))?;

    let args = args
        .iter()
        .map(|word| parse_arg(host, word))
        .collect::<mlua::Result<Vec<_>>>()
        .map_err(lua_error)?;
    tracing::debug!("running chunk with {} argument(s)", args.len());

    let source = match chunk {
        Chunk::File(path) => Source::file(path),
        Chunk::Inline(code) => Source::text(code),
    };
    bridge
        .load_and_run(host, source, args)
        .map_err(|err| describe(&err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn words(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_inline_chunk() {
        let host = Lua::new();
        let chunk = Chunk::Inline("local a, b = ... return a + b, math.type(a)".to_string());
        let results = evaluate(&host, &chunk, &words(&["40", "2"]), BridgeOptions::default()).unwrap();
        assert_eq!(results[0].as_integer(), Some(42));
    }

    #[test]
    fn test_file_chunk() {
        let host = Lua::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "return select('#', ...)").unwrap();

        let chunk = Chunk::File(file.path().to_path_buf());
        let results = evaluate(&host, &chunk, &words(&["nil", "x", "1.5"]), BridgeOptions::default()).unwrap();
        assert_eq!(results[0].as_integer(), Some(3));
    }

    #[test]
    fn test_failure_names_status() {
        let host = Lua::new();
        let chunk = Chunk::Inline("return +".to_string());
        let err = evaluate(&host, &chunk, &[], BridgeOptions::default()).unwrap_err();
        assert!(err.to_string().ends_with("(ERRSYNTAX)"));

        let chunk = Chunk::Inline("error('nope', 0)".to_string());
        let err = evaluate(&host, &chunk, &[], BridgeOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "nope (ERRRUN)");
    }

    #[test]
    fn test_without_libs() {
        let host = Lua::new();
        let chunk = Chunk::Inline("return string == nil".to_string());
        let options = BridgeOptions::with_libs(false);
        let results = evaluate(&host, &chunk, &[], options).unwrap();
        assert_eq!(results[0].as_boolean(), Some(true));
    }
}
