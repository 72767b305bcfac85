//! newstate - isolated child Lua states
//!
//! A [`Bridge`] owns an independent Lua 5.4 state (its own heap, collector
//! and globals), keeps one compiled entry point in it, and runs that entry
//! point with arguments deep-copied from a host state. Results, or a
//! `(message, code)` error payload, are copied back the same way. No live
//! object is ever shared between the two states.
//!
//! The crate can be used directly from Rust, or exposed to Lua scripts as
//! the `newstate` module (see [`lua_api`]).
//!
//! # Example
//!
//! ```rust,ignore
//! let host = mlua::Lua::new();
//! newstate::preload(&host)?;
//! host.load(r#"
//!     local newstate = require("newstate")
//!     local child = newstate.new()
//!     assert(child:loadstring("return select('#', ...)"))
//!     print(child:run(1, 2, 3)) --> true 3
//! "#).exec()?;
//! ```

pub mod bridge;
pub mod codes;
pub mod engine;
pub mod error;
pub mod gc;
pub mod invoke;
pub mod lua_api;
pub mod marshal;
pub mod options;

pub use bridge::Bridge;
pub use engine::{skip_script_header, ChildEngine, EntryHandle, Source};
pub use error::{BridgeError, BridgeResult, ErrorPayload};
pub use gc::{GcRequest, GcResponse};
pub use lua_api::{open, open_with, preload, preload_with, MODULE_NAME};
pub use marshal::{copy_range, copy_value, Marshaler};
pub use options::BridgeOptions;

/// Entry point when built as a Lua C module (`require "newstate"`).
#[cfg(feature = "module")]
#[mlua::lua_module]
fn newstate(lua: &mlua::Lua) -> mlua::Result<mlua::Table> {
    open(lua)
}
