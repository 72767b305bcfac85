//! Lua-facing surface of the bridge.
//!
//! `require("newstate")` yields a table holding `new` and the exported
//! status/collector constants. Handles returned by `new` expose:
//!
//! | Method | Returns |
//! |--------|---------|
//! | `loadstring(src)` / `loadfile(path)` | `true` or `false, message, code` |
//! | `run(...)` | `true, results...` or `false, message, code` |
//! | `dostring(src, ...)` / `dofile(path, ...)` | same as `run` |
//! | `gc(what [, a [, b [, c]]])` | integer or boolean |
//! | `close()` | nothing |

use std::path::PathBuf;

use mlua::{Lua, MetaMethod, MultiValue, Table, UserData, UserDataMethods, Value};
use tracing::warn;

use crate::bridge::Bridge;
use crate::codes;
use crate::engine::Source;
#[cfg(not(unix))]
use crate::error::ErrorPayload;
use crate::error::{BridgeError, BridgeResult};
use crate::gc::{GcRequest, GcResponse};
use crate::options::BridgeOptions;

/// Name the module is registered under
pub const MODULE_NAME: &str = "newstate";

impl UserData for Bridge {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method_mut("loadstring", |lua, this, source: mlua::String| {
            let result = this.load(Source::Text(&*source.as_bytes()));
            load_status(lua, result)
        });

        methods.add_method_mut("loadfile", |lua, this, path: mlua::String| {
            let result = path_arg(&path).and_then(|path| this.load(Source::File(&path)));
            load_status(lua, result)
        });

        methods.add_method_mut("run", |lua, this, args: MultiValue| {
            let result = this.run(lua, args);
            run_status(lua, result)
        });

        methods.add_method_mut(
            "dostring",
            |lua, this, (source, args): (mlua::String, MultiValue)| {
                let source = source.as_bytes().to_vec();
                let result = this.do_text(lua, source, args);
                run_status(lua, result)
            },
        );

        methods.add_method_mut(
            "dofile",
            |lua, this, (path, args): (mlua::String, MultiValue)| {
                let result = path_arg(&path).and_then(|path| this.do_file(lua, path, args));
                run_status(lua, result)
            },
        );

        methods.add_method(
            "gc",
            |_, this, (what, a, b, c): (i64, Option<i64>, Option<i64>, Option<i64>)| {
                let params = [a.unwrap_or(0), b.unwrap_or(0), c.unwrap_or(0)];
                let request = GcRequest::from_raw(what, params).map_err(into_lua_error)?;
                let response = this.gc(request).map_err(into_lua_error)?;
                Ok(match response {
                    GcResponse::Integer(value) => Value::Integer(value),
                    GcResponse::Boolean(value) => Value::Boolean(value),
                })
            },
        );

        methods.add_method_mut("close", |_, this, ()| {
            this.close();
            Ok(())
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}: {:p}", MODULE_NAME, this))
        });
    }
}

/// Filesystem path named by the raw bytes of a Lua string.
#[cfg(unix)]
fn path_arg(path: &mlua::String) -> BridgeResult<PathBuf> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    Ok(PathBuf::from(OsStr::from_bytes(&path.as_bytes())))
}

/// Filesystem path named by a Lua string; non-UTF-8 names cannot be opened.
#[cfg(not(unix))]
fn path_arg(path: &mlua::String) -> BridgeResult<PathBuf> {
    let bytes = path.as_bytes();
    match std::str::from_utf8(&bytes) {
        Ok(text) => Ok(PathBuf::from(text)),
        Err(err) => Err(BridgeError::Compile(ErrorPayload::new(
            format!("cannot open {}: {}", String::from_utf8_lossy(&bytes), err),
            codes::ERRFILE,
        ))),
    }
}

fn into_lua_error(err: BridgeError) -> mlua::Error {
    mlua::Error::RuntimeError(err.to_string())
}

/// `false, message, code`
fn failure(lua: &Lua, err: &BridgeError) -> mlua::Result<MultiValue> {
    let payload = err.payload();
    Ok(MultiValue::from_vec(vec![
        Value::Boolean(false),
        Value::String(lua.create_string(&payload.message)?),
        Value::Integer(payload.code as i64),
    ]))
}

fn load_status(lua: &Lua, result: BridgeResult<()>) -> mlua::Result<MultiValue> {
    match result {
        Ok(()) => Ok(MultiValue::from_vec(vec![Value::Boolean(true)])),
        Err(err) => failure(lua, &err),
    }
}

fn run_status(lua: &Lua, result: BridgeResult<Vec<Value>>) -> mlua::Result<MultiValue> {
    match result {
        Ok(results) => {
            let mut values = Vec::with_capacity(results.len() + 1);
            values.push(Value::Boolean(true));
            values.extend(results);
            Ok(MultiValue::from_vec(values))
        }
        Err(err) => failure(lua, &err),
    }
}

/// Build the module table: `new` plus every exported constant.
pub fn open(lua: &Lua) -> mlua::Result<Table> {
    open_with(lua, BridgeOptions::default())
}

/// Like [`open`], but bridges created by `new` start from `defaults`.
///
/// An explicit boolean passed to `new` still overrides `open_libs`.
pub fn open_with(lua: &Lua, defaults: BridgeOptions) -> mlua::Result<Table> {
    let module = lua.create_table()?;

    let new = lua.create_function(move |_, open_libs: Value| {
        let open_libs = match open_libs {
            Value::Nil => defaults.open_libs,
            Value::Boolean(flag) => flag,
            other => {
                return Err(mlua::Error::RuntimeError(format!(
                    "bad argument #1 to 'new' (boolean expected, got {})",
                    other.type_name()
                )))
            }
        };

        let options = BridgeOptions {
            open_libs,
            ..defaults.clone()
        };
        match Bridge::with_options(options) {
            Ok(bridge) => Ok(Some(bridge)),
            Err(err) => {
                warn!("{}", err);
                Ok(None)
            }
        }
    })?;
    module.set("new", new)?;

    for (name, code) in codes::ERROR_CODES.iter().chain(codes::GC_CODES) {
        module.set(*name, *code)?;
    }

    Ok(module)
}

/// Make `require("newstate")` available in `lua` without a C module.
pub fn preload(lua: &Lua) -> mlua::Result<()> {
    preload_with(lua, BridgeOptions::default())
}

/// [`preload`] with default options for every bridge the module creates
pub fn preload_with(lua: &Lua, defaults: BridgeOptions) -> mlua::Result<()> {
    let package: Table = lua.globals().get("package")?;
    let loaders: Table = package.get("preload")?;
    let loader = lua.create_function(move |lua, ()| open_with(lua, defaults.clone()))?;
    loaders.set(MODULE_NAME, loader)?;
    Ok(())
}
