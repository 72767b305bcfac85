//! `newstate run` - run a host Lua script with the `newstate` module preloaded.

use std::path::Path;

use anyhow::Context;
use mlua::{Lua, MultiValue, Value};
use newstate::BridgeOptions;

use super::lua_error;

/// Run `script` in a host engine.
///
/// `args` are passed as strings, both as the chunk's `...` and in the global
/// `arg` table (`arg[0]` is the script path). Bridges created by the script
/// start from `options`.
pub fn execute(script: &Path, args: &[String], options: BridgeOptions) -> anyhow::Result<()> {
    let source = std::fs::read(script)
        .with_context(|| format!("cannot read {}", script.display()))?;

    let lua = Lua::new();
    install(&lua, script, args, options).map_err(lua_error)?;

    let chunk = lua
        .load(newstate::skip_script_header(&source))
        .set_name(format!("@{}", script.display()));
    let varargs = string_args(&lua, args).map_err(lua_error)?;
    let _: MultiValue = chunk.call(varargs).map_err(lua_error)?;
    Ok(())
}

fn install(lua: &Lua, script: &Path, args: &[String], options: BridgeOptions) -> mlua::Result<()> {
    newstate::preload_with(lua, options)?;

    let arg = lua.create_table()?;
    arg.raw_set(0, script.display().to_string())?;
    for (i, word) in args.iter().enumerate() {
        arg.raw_set(i + 1, word.as_str())?;
    }
    lua.globals().set("arg", arg)
}

fn string_args(lua: &Lua, args: &[String]) -> mlua::Result<MultiValue> {
    let values = args
        .iter()
        .map(|word| lua.create_string(word).map(Value::String))
        .collect::<mlua::Result<Vec<_>>>()?;
    Ok(MultiValue::from_vec(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn script(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn test_script_uses_module() {
        let file = script(
            r#"
            local newstate = require("newstate")
            local child = newstate.new()
            local ok, n = child:dostring("return ... * 2", tonumber((...)))
            assert(ok and n == 42, "bad result")
            assert(arg[1] == "21")
            "#,
        );
        execute(file.path(), &["21".to_string()], BridgeOptions::default()).unwrap();
    }

    #[test]
    fn test_options_reach_child_states() {
        let file = script(
            r#"
            local child = require("newstate").new()
            local ok, missing = child:dostring("return string == nil")
            assert(ok and missing, "libraries were loaded")
            "#,
        );
        execute(file.path(), &[], BridgeOptions::with_libs(false)).unwrap();
    }

    #[test]
    fn test_script_error_is_reported() {
        let file = script("error('script failed')");
        let err = execute(file.path(), &[], BridgeOptions::default()).unwrap_err();
        assert!(err.to_string().contains("script failed"));
    }

    #[test]
    fn test_shebang_script() {
        let file = script("#!/usr/bin/env newstate run\nassert(require('newstate').OK == 0)\n");
        execute(file.path(), &[], BridgeOptions::default()).unwrap();

        // Line numbers still count the skipped first line
        let file = script("#!/usr/bin/env newstate run\nerror('line two')\n");
        let err = execute(file.path(), &[], BridgeOptions::default()).unwrap_err();
        assert!(err.to_string().contains(":2: line two"));
    }

    #[test]
    fn test_missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(&dir.path().join("nope.lua"), &[], BridgeOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("cannot read"));
    }
}
