//! The bridge: a handle that owns one child engine and its entry point.
//!
//! # Example
//!
//! ```rust,ignore
//! use mlua::{Lua, Value};
//! use newstate::{Bridge, Source};
//!
//! let host = Lua::new();
//! let mut bridge = Bridge::new()?;
//! bridge.load(Source::text("local a, b = ... return a + b"))?;
//! let results = bridge.run(&host, [Value::Integer(1), Value::Integer(2)])?;
//! assert_eq!(results[0].as_integer(), Some(3));
//! ```
//!
//! A bridge is not `Send`: every operation on it must happen on the thread
//! that created it.

use mlua::{Lua, Value};
use tracing::{debug, trace};

use crate::engine::{ChildEngine, EntryHandle, Source};
use crate::error::{BridgeError, BridgeResult};
use crate::gc::{GcRequest, GcResponse};
use crate::invoke::invoke;
use crate::marshal::copy_range;
use crate::options::BridgeOptions;

/// Owns an isolated child engine and at most one loaded entry point.
pub struct Bridge {
    /// None once closed
    engine: Option<ChildEngine>,
    entry: Option<EntryHandle>,
    options: BridgeOptions,
}

impl Bridge {
    /// Create a bridge with the standard library loaded
    pub fn new() -> BridgeResult<Self> {
        Self::with_options(BridgeOptions::default())
    }

    /// Create a bridge with explicit options
    pub fn with_options(options: BridgeOptions) -> BridgeResult<Self> {
        let engine = ChildEngine::new(&options)?;
        Ok(Self {
            engine: Some(engine),
            entry: None,
            options,
        })
    }

    /// Options this bridge was created with
    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Whether an entry point is currently loaded
    pub fn has_entry_point(&self) -> bool {
        self.entry.is_some()
    }

    /// Whether [`close`](Self::close) has run
    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    /// Bytes allocated by the child engine
    pub fn used_memory(&self) -> BridgeResult<usize> {
        Ok(self.engine()?.used_memory())
    }

    fn engine(&self) -> BridgeResult<&ChildEngine> {
        self.engine.as_ref().ok_or(BridgeError::Closed)
    }

    /// Compile `source` as the new entry point.
    ///
    /// The previous entry point is released before compiling, so a failed
    /// load leaves the bridge with no entry point at all.
    pub fn load(&mut self, source: Source<'_>) -> BridgeResult<()> {
        let engine = self.engine.as_ref().ok_or(BridgeError::Closed)?;

        if let Some(previous) = self.entry.take() {
            engine.release(previous)?;
        }

        let function = engine.compile(source).map_err(|payload| {
            debug!("load failed: {} (code {})", payload.message, payload.code);
            BridgeError::Compile(payload)
        })?;
        self.entry = Some(engine.pin(function)?);
        trace!("entry point loaded");
        Ok(())
    }

    /// Compile in-memory source as the new entry point
    pub fn load_text(&mut self, source: impl AsRef<[u8]>) -> BridgeResult<()> {
        self.load(Source::Text(source.as_ref()))
    }

    /// Compile a file as the new entry point
    pub fn load_file(&mut self, path: impl AsRef<std::path::Path>) -> BridgeResult<()> {
        self.load(Source::File(path.as_ref()))
    }

    /// Call the entry point with `args` copied from the host engine.
    ///
    /// Results are copied back into `host`, in order.
    pub fn run<I>(&mut self, host: &Lua, args: I) -> BridgeResult<Vec<Value>>
    where
        I: IntoIterator<Item = Value>,
    {
        let engine = self.engine()?;
        let handle = self.entry.as_ref().ok_or(BridgeError::NoEntryPoint)?;
        let entry = engine.resolve(handle)?;
        let max_depth = self.options.max_depth;

        let args: Vec<Value> = args.into_iter().collect();
        let args = copy_range(engine.lua(), &args, max_depth).map_err(|payload| {
            debug!("argument marshaling failed: {}", payload.message);
            BridgeError::Marshal(payload)
        })?;
        trace!("invoking entry point with {} argument(s)", args.len());

        let results = invoke(&entry, args).map_err(BridgeError::Runtime)?;

        copy_range(host, &results, max_depth).map_err(|payload| {
            debug!("result marshaling failed: {}", payload.message);
            BridgeError::Marshal(payload)
        })
    }

    /// Load `source` and run it with `args`.
    ///
    /// A load failure is reported before any argument is copied.
    pub fn load_and_run<I>(&mut self, host: &Lua, source: Source<'_>, args: I) -> BridgeResult<Vec<Value>>
    where
        I: IntoIterator<Item = Value>,
    {
        self.load(source)?;
        self.run(host, args)
    }

    /// Load in-memory source and run it
    pub fn do_text<I>(&mut self, host: &Lua, source: impl AsRef<[u8]>, args: I) -> BridgeResult<Vec<Value>>
    where
        I: IntoIterator<Item = Value>,
    {
        self.load_and_run(host, Source::Text(source.as_ref()), args)
    }

    /// Load a file and run it
    pub fn do_file<I>(
        &mut self,
        host: &Lua,
        path: impl AsRef<std::path::Path>,
        args: I,
    ) -> BridgeResult<Vec<Value>>
    where
        I: IntoIterator<Item = Value>,
    {
        self.load_and_run(host, Source::File(path.as_ref()), args)
    }

    /// Forward a collector request to the child engine.
    pub fn gc(&self, request: GcRequest) -> BridgeResult<GcResponse> {
        self.engine()?.collect_garbage(request)
    }

    /// Release the entry point and destroy the child engine.
    ///
    /// Safe to call more than once; later operations fail with
    /// [`BridgeError::Closed`].
    pub fn close(&mut self) {
        let Some(engine) = self.engine.take() else {
            return;
        };
        if let Some(entry) = self.entry.take() {
            // The engine is dropped right after, so the slot is freed either way
            let _ = engine.release(entry);
        }
        drop(engine);
        debug!("child engine closed");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("closed", &self.is_closed())
            .field("has_entry_point", &self.has_entry_point())
            .field("options", &self.options)
            .finish()
    }
}
