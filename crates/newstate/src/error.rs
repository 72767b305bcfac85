//! Error types for bridge operations.

use crate::codes;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// A `(message, code)` pair describing a failure.
///
/// `code` is either an engine status (`ERRRUN`, `ERRSYNTAX`, ...) or one of
/// the bridge-owned negative codes (`ERRARGS`, ...).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ErrorPayload {
    /// Diagnostic text
    pub message: String,
    /// Numeric status
    pub code: i32,
}

impl ErrorPayload {
    /// Create a payload from its parts
    pub fn new(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// Payload for a value that cannot cross the engine boundary
    pub fn unsupported(type_name: &str) -> Self {
        Self::new(format!("cannot exchange <{}> value", type_name), codes::ERRARGS)
    }

    /// Map an engine error to the status the engine reported for it.
    pub fn from_lua_error(err: &mlua::Error) -> Self {
        match err {
            mlua::Error::SyntaxError { message, .. } => {
                Self::new(strip_traceback(message), codes::ERRSYNTAX)
            }
            mlua::Error::MemoryError(message) => Self::new(strip_traceback(message), codes::ERRMEM),
            mlua::Error::RuntimeError(message) => {
                let message = strip_traceback(message);
                let code = if message.starts_with("error in error handling") {
                    codes::ERRERR
                } else {
                    codes::ERRRUN
                };
                Self::new(message, code)
            }
            mlua::Error::CallbackError { cause, .. } => Self::from_lua_error(cause),
            other => Self::new(strip_traceback(&other.to_string()), codes::ERRRUN),
        }
    }
}

impl From<mlua::Error> for ErrorPayload {
    fn from(err: mlua::Error) -> Self {
        Self::from_lua_error(&err)
    }
}

/// The protected call appends a stack traceback; callers only see the
/// diagnostic value itself.
fn strip_traceback(message: &str) -> String {
    match message.find("\nstack traceback:") {
        Some(pos) => message[..pos].to_string(),
        None => message.to_string(),
    }
}

/// Errors that can occur while creating or driving a bridge.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    /// The child engine could not be allocated
    #[error("cannot create child engine: {0}")]
    Create(String),

    /// Source failed to compile or could not be read
    #[error("{0}")]
    Compile(ErrorPayload),

    /// A value could not be copied between engines
    #[error("{0}")]
    Marshal(ErrorPayload),

    /// The entry point raised an error
    #[error("{0}")]
    Runtime(ErrorPayload),

    /// `run` was called before a successful load
    #[error("no entry point loaded")]
    NoEntryPoint,

    /// The bridge has been closed
    #[error("bridge is closed")]
    Closed,

    /// Collector operation not supported by this engine
    #[error("unsupported collector operation {0}")]
    UnsupportedGcOperation(i64),

    /// Engine primitive failed outside compile/run
    #[error("engine error: {0}")]
    Engine(#[from] mlua::Error),
}

impl BridgeError {
    /// Numeric status for this error
    pub fn code(&self) -> i32 {
        match self {
            BridgeError::Create(_) => codes::ERRMEM,
            BridgeError::Compile(payload)
            | BridgeError::Marshal(payload)
            | BridgeError::Runtime(payload) => payload.code,
            BridgeError::NoEntryPoint => codes::ERRNOENTRY,
            BridgeError::Closed => codes::ERRCLOSED,
            BridgeError::UnsupportedGcOperation(_) => codes::ERRARGS,
            BridgeError::Engine(err) => ErrorPayload::from_lua_error(err).code,
        }
    }

    /// Flatten into the `(message, code)` pair handed back to scripts
    pub fn payload(&self) -> ErrorPayload {
        match self {
            BridgeError::Compile(payload)
            | BridgeError::Marshal(payload)
            | BridgeError::Runtime(payload) => payload.clone(),
            BridgeError::Engine(err) => ErrorPayload::from_lua_error(err),
            other => ErrorPayload::new(other.to_string(), other.code()),
        }
    }
}
