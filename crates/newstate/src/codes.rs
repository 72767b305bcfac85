//! Exported status and collector codes.
//!
//! Engine-defined values are those of Lua 5.4 (`lua.h` / `lauxlib.h`).
//! Negative codes are owned by the bridge and never collide with engine
//! statuses.

// ============================================================================
// Status codes
// ============================================================================

/// No error
pub const OK: i32 = 0;
/// A value could not cross the engine boundary
pub const ERRARGS: i32 = -1;
/// `run` was called without a loaded entry point
pub const ERRNOENTRY: i32 = -2;
/// The bridge has already been closed
pub const ERRCLOSED: i32 = -3;

/// Runtime error (`LUA_ERRRUN`)
pub const ERRRUN: i32 = 2;
/// Syntax error during precompilation (`LUA_ERRSYNTAX`)
pub const ERRSYNTAX: i32 = 3;
/// Memory allocation error (`LUA_ERRMEM`)
pub const ERRMEM: i32 = 4;
/// Error while running the message handler (`LUA_ERRERR`)
pub const ERRERR: i32 = 5;
/// File cannot be opened or read (`LUA_ERRFILE`)
pub const ERRFILE: i32 = 6;

// ============================================================================
// Collector operations
// ============================================================================

pub const GCSTOP: i32 = 0;
pub const GCRESTART: i32 = 1;
pub const GCCOLLECT: i32 = 2;
pub const GCCOUNT: i32 = 3;
pub const GCCOUNTB: i32 = 4;
pub const GCSTEP: i32 = 5;
pub const GCSETPAUSE: i32 = 6;
pub const GCSETSTEPMUL: i32 = 7;
pub const GCISRUNNING: i32 = 9;
/// Switch to generational mode; also reported as the previous mode
pub const GCGEN: i32 = 10;
/// Switch to incremental mode; also reported as the previous mode
pub const GCINC: i32 = 11;

/// Status codes in export order.
pub const ERROR_CODES: &[(&str, i32)] = &[
    ("OK", OK),
    ("ERRARGS", ERRARGS),
    ("ERRNOENTRY", ERRNOENTRY),
    ("ERRCLOSED", ERRCLOSED),
    ("ERRRUN", ERRRUN),
    ("ERRSYNTAX", ERRSYNTAX),
    ("ERRMEM", ERRMEM),
    ("ERRERR", ERRERR),
    ("ERRFILE", ERRFILE),
];

/// Collector operation and mode codes in export order.
pub const GC_CODES: &[(&str, i32)] = &[
    ("GCSTOP", GCSTOP),
    ("GCRESTART", GCRESTART),
    ("GCCOLLECT", GCCOLLECT),
    ("GCCOUNT", GCCOUNT),
    ("GCCOUNTB", GCCOUNTB),
    ("GCSTEP", GCSTEP),
    ("GCSETPAUSE", GCSETPAUSE),
    ("GCSETSTEPMUL", GCSETSTEPMUL),
    ("GCISRUNNING", GCISRUNNING),
    ("GCGEN", GCGEN),
    ("GCINC", GCINC),
];

/// Human-readable name of a status code, if it is one of ours.
pub fn status_name(code: i32) -> Option<&'static str> {
    ERROR_CODES
        .iter()
        .find(|(_, value)| *value == code)
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let errors: HashSet<i32> = ERROR_CODES.iter().map(|(_, c)| *c).collect();
        assert_eq!(errors.len(), ERROR_CODES.len());

        let gc: HashSet<i32> = GC_CODES.iter().map(|(_, c)| *c).collect();
        assert_eq!(gc.len(), GC_CODES.len());
    }

    #[test]
    fn test_status_name() {
        assert_eq!(status_name(ERRARGS), Some("ERRARGS"));
        assert_eq!(status_name(ERRSYNTAX), Some("ERRSYNTAX"));
        assert_eq!(status_name(42), None);
    }
}
