//! Garbage collector control forwarded to a child engine.
//!
//! The collector protocol is an integer operation code plus up to three
//! integer parameters. [`GcRequest::from_raw`] decodes it into a typed
//! request; operations the engine does not support are rejected instead of
//! being forwarded blindly.

use mlua::{GCMode, Lua};

use crate::codes;
use crate::error::{BridgeError, BridgeResult};

/// A collector operation with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcRequest {
    /// Stop the collector
    Stop,
    /// Restart the collector
    Restart,
    /// Perform a full collection cycle
    Collect,
    /// Memory in use, in KiB
    Count,
    /// Remainder of memory in use modulo 1024, in bytes
    CountBytes,
    /// Incremental step of the given size in KiB
    Step(i32),
    /// Set the collector pause, returning the previous value
    SetPause(i32),
    /// Set the step multiplier, returning the previous value
    SetStepMultiplier(i32),
    /// Whether the collector is running
    IsRunning,
    /// Switch to incremental mode (0 keeps a parameter unchanged)
    Incremental {
        pause: i32,
        step_multiplier: i32,
        step_size: i32,
    },
    /// Switch to generational mode (0 keeps a parameter unchanged)
    Generational {
        minor_multiplier: i32,
        major_multiplier: i32,
    },
}

/// What the collector reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcResponse {
    Integer(i64),
    Boolean(bool),
}

impl GcResponse {
    /// Integer value, if this is an integer response
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            GcResponse::Integer(value) => Some(*value),
            GcResponse::Boolean(_) => None,
        }
    }

    /// Boolean value, if this is a boolean response
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            GcResponse::Boolean(value) => Some(*value),
            GcResponse::Integer(_) => None,
        }
    }
}

fn clamp(param: i64) -> i32 {
    param.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl GcRequest {
    /// Decode an operation code and its parameters.
    ///
    /// Missing parameters are passed as 0.
    pub fn from_raw(what: i64, params: [i64; 3]) -> BridgeResult<Self> {
        let [a, b, c] = params.map(clamp);
        let op = i32::try_from(what).map_err(|_| BridgeError::UnsupportedGcOperation(what))?;

        let request = match op {
            codes::GCSTOP => GcRequest::Stop,
            codes::GCRESTART => GcRequest::Restart,
            codes::GCCOLLECT => GcRequest::Collect,
            codes::GCCOUNT => GcRequest::Count,
            codes::GCCOUNTB => GcRequest::CountBytes,
            codes::GCSTEP => GcRequest::Step(a),
            codes::GCSETPAUSE => GcRequest::SetPause(a),
            codes::GCSETSTEPMUL => GcRequest::SetStepMultiplier(a),
            codes::GCISRUNNING => GcRequest::IsRunning,
            codes::GCINC => GcRequest::Incremental {
                pause: a,
                step_multiplier: b,
                step_size: c,
            },
            codes::GCGEN => GcRequest::Generational {
                minor_multiplier: a,
                major_multiplier: b,
            },
            _ => return Err(BridgeError::UnsupportedGcOperation(what)),
        };
        Ok(request)
    }

    /// Operation code of this request
    pub fn code(&self) -> i32 {
        match self {
            GcRequest::Stop => codes::GCSTOP,
            GcRequest::Restart => codes::GCRESTART,
            GcRequest::Collect => codes::GCCOLLECT,
            GcRequest::Count => codes::GCCOUNT,
            GcRequest::CountBytes => codes::GCCOUNTB,
            GcRequest::Step(_) => codes::GCSTEP,
            GcRequest::SetPause(_) => codes::GCSETPAUSE,
            GcRequest::SetStepMultiplier(_) => codes::GCSETSTEPMUL,
            GcRequest::IsRunning => codes::GCISRUNNING,
            GcRequest::Incremental { .. } => codes::GCINC,
            GcRequest::Generational { .. } => codes::GCGEN,
        }
    }

    /// Forward this request to `lua`'s collector.
    pub(crate) fn apply(self, lua: &Lua) -> mlua::Result<GcResponse> {
        let response = match self {
            GcRequest::Stop => {
                lua.gc_stop();
                GcResponse::Integer(0)
            }
            GcRequest::Restart => {
                lua.gc_restart();
                GcResponse::Integer(0)
            }
            GcRequest::Collect => {
                lua.gc_collect()?;
                GcResponse::Integer(0)
            }
            GcRequest::Count => GcResponse::Integer((lua.used_memory() / 1024) as i64),
            GcRequest::CountBytes => GcResponse::Integer((lua.used_memory() % 1024) as i64),
            GcRequest::Step(kbytes) => {
                let finished = lua.gc_step_kbytes(kbytes)?;
                GcResponse::Integer(finished as i64)
            }
            GcRequest::SetPause(pause) => GcResponse::Integer(lua.gc_set_pause(pause) as i64),
            GcRequest::SetStepMultiplier(mul) => {
                GcResponse::Integer(lua.gc_set_step_multiplier(mul) as i64)
            }
            GcRequest::IsRunning => GcResponse::Boolean(lua.gc_is_running()),
            GcRequest::Incremental {
                pause,
                step_multiplier,
                step_size,
            } => mode_code(lua.gc_inc(pause, step_multiplier, step_size)),
            GcRequest::Generational {
                minor_multiplier,
                major_multiplier,
            } => mode_code(lua.gc_gen(minor_multiplier, major_multiplier)),
        };
        Ok(response)
    }
}

fn mode_code(previous: GCMode) -> GcResponse {
    let code = match previous {
        GCMode::Generational => codes::GCGEN,
        _ => codes::GCINC,
    };
    GcResponse::Integer(code as i64)
}
