//! Protected invocation of an entry point.

use mlua::{Function, MultiValue, Value};

use crate::error::ErrorPayload;

/// Call `entry` with already-marshaled `args`, keeping every result.
///
/// Errors raised inside the child engine are caught and reported as a
/// payload carrying the engine status and the diagnostic value.
pub fn invoke(entry: &Function, args: Vec<Value>) -> Result<Vec<Value>, ErrorPayload> {
    let results: MultiValue = entry.call(MultiValue::from_vec(args))?;
    Ok(results.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;
    use mlua::Lua;

    #[test]
    fn test_multiple_results() {
        let lua = Lua::new();
        let func: Function = lua.load("return ..., 'tail'").into_function().unwrap();

        let results = invoke(&func, vec![Value::Integer(1), Value::Nil]).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_integer(), Some(1));
        assert!(results[1].is_nil());
    }

    #[test]
    fn test_runtime_error() {
        let lua = Lua::new();
        let func: Function = lua.load("error('boom', 0)").into_function().unwrap();

        let err = invoke(&func, Vec::new()).unwrap_err();
        assert_eq!(err.code, codes::ERRRUN);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_memory_error() {
        let lua = Lua::new();
        lua.set_memory_limit(lua.used_memory() + 64 * 1024).unwrap();
        let func: Function = lua
            .load("local t = {} for i = 1, 1e7 do t[i] = i end")
            .into_function()
            .unwrap();

        let err = invoke(&func, Vec::new()).unwrap_err();
        assert_eq!(err.code, codes::ERRMEM);
    }
}
