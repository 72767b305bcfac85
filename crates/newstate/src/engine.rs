//! The child engine owned by a bridge.
//!
//! Wraps an independent Lua state with its own heap, collector and globals,
//! and exposes only the primitives the bridge needs: compile, pin/resolve/
//! release of the persistent entry slot, and collector control.

use std::path::Path;

use mlua::{Function, Lua, LuaOptions, RegistryKey, StdLib};
use tracing::debug;

use crate::codes;
use crate::error::{BridgeError, BridgeResult, ErrorPayload};
use crate::gc::{GcRequest, GcResponse};
use crate::options::BridgeOptions;

/// Where source code for an entry point comes from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Source text or a precompiled chunk held in memory
    Text(&'a [u8]),
    /// Path of a file to read and compile
    File(&'a Path),
}

impl<'a> Source<'a> {
    /// In-memory source
    pub fn text<S: AsRef<[u8]> + ?Sized>(source: &'a S) -> Self {
        Source::Text(source.as_ref())
    }

    /// File source
    pub fn file<P: AsRef<Path> + ?Sized>(path: &'a P) -> Self {
        Source::File(path.as_ref())
    }
}

/// Opaque handle to a function pinned in the child engine's registry.
///
/// Only obtainable from [`ChildEngine::pin`] and only released through
/// [`ChildEngine::release`].
#[derive(Debug)]
pub struct EntryHandle(RegistryKey);

/// An isolated Lua state.
pub struct ChildEngine {
    lua: Lua,
}

impl ChildEngine {
    /// Create a child engine.
    pub fn new(options: &BridgeOptions) -> BridgeResult<Self> {
        let libs = if options.open_libs {
            StdLib::ALL_SAFE
        } else {
            StdLib::NONE
        };
        let lua = Lua::new_with(libs, LuaOptions::default())
            .map_err(|err| BridgeError::Create(err.to_string()))?;

        if let Some(limit) = options.memory_limit {
            lua.set_memory_limit(limit)
                .map_err(|err| BridgeError::Create(err.to_string()))?;
        }

        debug!(
            "created child engine (open_libs: {}, memory_limit: {:?})",
            options.open_libs, options.memory_limit
        );
        Ok(Self { lua })
    }

    /// The underlying state, for marshaling into it
    pub(crate) fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Compile `source` into a function without running it.
    pub fn compile(&self, source: Source<'_>) -> Result<Function, ErrorPayload> {
        match source {
            Source::Text(text) => {
                let name = chunk_name(text);
                Ok(self.lua.load(text).set_name(name).into_function()?)
            }
            Source::File(path) => {
                let bytes = std::fs::read(path).map_err(|err| {
                    ErrorPayload::new(
                        format!("cannot open {}: {}", path.display(), err),
                        codes::ERRFILE,
                    )
                })?;
                let name = format!("@{}", path.display());
                let body = skip_script_header(&bytes);
                Ok(self.lua.load(body).set_name(name).into_function()?)
            }
        }
    }

    /// Pin `function` in the registry so it survives across calls.
    pub fn pin(&self, function: Function) -> BridgeResult<EntryHandle> {
        Ok(EntryHandle(self.lua.create_registry_value(function)?))
    }

    /// Fetch the function behind `handle`.
    pub fn resolve(&self, handle: &EntryHandle) -> BridgeResult<Function> {
        Ok(self.lua.registry_value(&handle.0)?)
    }

    /// Unpin the function behind `handle`.
    pub fn release(&self, handle: EntryHandle) -> BridgeResult<()> {
        Ok(self.lua.remove_registry_value(handle.0)?)
    }

    /// Forward a collector request.
    pub fn collect_garbage(&self, request: GcRequest) -> BridgeResult<GcResponse> {
        Ok(request.apply(&self.lua)?)
    }

    /// Bytes currently allocated by this engine
    pub fn used_memory(&self) -> usize {
        self.lua.used_memory()
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Drop what a file loader skips before compiling: a UTF-8 byte order mark,
/// then a first line starting with `#` (such as a shebang).
///
/// The newline ending a skipped line is kept so line numbers in
/// diagnostics still match the file.
pub fn skip_script_header(source: &[u8]) -> &[u8] {
    let source = source.strip_prefix(UTF8_BOM).unwrap_or(source);
    if source.first() != Some(&b'#') {
        return source;
    }
    match source.iter().position(|&b| b == b'\n') {
        Some(newline) => &source[newline..],
        None => &[],
    }
}

/// Text chunks are named after their own source, which Lua renders as
/// `[string "..."]` in diagnostics. Chunk names cannot hold NUL bytes.
fn chunk_name(source: &[u8]) -> String {
    String::from_utf8_lossy(source).replace('\0', "")
}
