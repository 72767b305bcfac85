//! Deep copy of values between independent engines.
//!
//! Values never move between engines by reference: every supported value is
//! rebuilt inside the destination engine. Only nil, booleans, light
//! userdata, numbers, strings and tables can cross. Functions, full
//! userdata, threads and error objects belong to the engine that created
//! them and are rejected with an `ERRARGS` payload.
//!
//! A table is copied by visiting its pairs in the source engine's own
//! traversal order and inserting raw copies of each key and value into a
//! fresh table, so key order is not preserved and metatables are dropped.
//! Tables reachable from themselves, or nested deeper than the configured
//! limit, are rejected. On failure the partially built destination value is
//! simply dropped.

use std::ffi::c_void;

use mlua::{LightUserData, Lua, Table, Value};
use tracing::trace;

use crate::codes;
use crate::error::ErrorPayload;
use crate::options::DEFAULT_MAX_DEPTH;

/// Copies values into one destination engine.
pub struct Marshaler<'a> {
    dst: &'a Lua,
    max_depth: usize,
    /// Tables currently being copied, outermost first
    path: Vec<*const c_void>,
}

impl<'a> Marshaler<'a> {
    /// Marshaler writing into `dst` with the default nesting limit
    pub fn new(dst: &'a Lua) -> Self {
        Self::with_max_depth(dst, DEFAULT_MAX_DEPTH)
    }

    /// Marshaler writing into `dst`, rejecting tables nested deeper than
    /// `max_depth`
    pub fn with_max_depth(dst: &'a Lua, max_depth: usize) -> Self {
        Self {
            dst,
            max_depth,
            path: Vec::new(),
        }
    }

    /// Rebuild `value` inside the destination engine.
    pub fn copy(&mut self, value: &Value) -> Result<Value, ErrorPayload> {
        match value {
            Value::Nil => Ok(Value::Nil),
            Value::Boolean(b) => Ok(Value::Boolean(*b)),
            Value::LightUserData(ud) => Ok(Value::LightUserData(LightUserData(ud.0))),
            Value::Integer(i) => Ok(Value::Integer(*i)),
            Value::Number(n) => Ok(Value::Number(*n)),
            Value::String(s) => {
                let copied = self.dst.create_string(&*s.as_bytes())?;
                Ok(Value::String(copied))
            }
            Value::Table(table) => self.copy_table(table),
            Value::Function(_) => Err(ErrorPayload::unsupported("function")),
            Value::Thread(_) => Err(ErrorPayload::unsupported("thread")),
            Value::UserData(_) => Err(ErrorPayload::unsupported("userdata")),
            other => Err(ErrorPayload::unsupported(other.type_name())),
        }
    }

    fn copy_table(&mut self, table: &Table) -> Result<Value, ErrorPayload> {
        let ptr = table.to_pointer();
        if self.path.contains(&ptr) {
            return Err(ErrorPayload::new(
                "cannot exchange cyclic <table> value",
                codes::ERRARGS,
            ));
        }
        if self.path.len() >= self.max_depth {
            return Err(ErrorPayload::new(
                format!(
                    "cannot exchange <table> value nested deeper than {} levels",
                    self.max_depth
                ),
                codes::ERRARGS,
            ));
        }

        self.path.push(ptr);
        let copied = self.copy_pairs(table);
        self.path.pop();
        copied.map(Value::Table)
    }

    fn copy_pairs(&mut self, table: &Table) -> Result<Table, ErrorPayload> {
        let copied = self.dst.create_table_with_capacity(table.raw_len(), 0)?;
        for pair in table.clone().pairs::<Value, Value>() {
            let (key, value) = pair?;
            let key = self.copy(&key)?;
            let value = self.copy(&value)?;
            copied.raw_set(key, value)?;
        }
        Ok(copied)
    }
}

/// Copy a single value into `dst`.
pub fn copy_value(dst: &Lua, value: &Value, max_depth: usize) -> Result<Value, ErrorPayload> {
    Marshaler::with_max_depth(dst, max_depth).copy(value)
}

/// Copy every value of `values` into `dst`, in order, stopping at the first
/// failure.
pub fn copy_range(dst: &Lua, values: &[Value], max_depth: usize) -> Result<Vec<Value>, ErrorPayload> {
    let mut marshaler = Marshaler::with_max_depth(dst, max_depth);
    let copied = values
        .iter()
        .map(|value| marshaler.copy(value))
        .collect::<Result<Vec<_>, _>>();
    if let Err(payload) = &copied {
        trace!("marshaling aborted: {}", payload.message);
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_copy_by_value() {
        let src = Lua::new();
        let dst = Lua::new();

        let values = vec![
            Value::Nil,
            Value::Boolean(true),
            Value::Integer(-7),
            Value::Number(0.5),
            Value::String(src.create_string(b"a\0b").unwrap()),
        ];
        let copied = copy_range(&dst, &values, DEFAULT_MAX_DEPTH).unwrap();

        assert_eq!(copied.len(), 5);
        assert!(copied[0].is_nil());
        assert_eq!(copied[1].as_boolean(), Some(true));
        assert_eq!(copied[2].as_integer(), Some(-7));
        assert_eq!(copied[3].as_number(), Some(0.5));
        match &copied[4] {
            Value::String(s) => assert_eq!(&*s.as_bytes(), b"a\0b"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_table_copy() {
        let src = Lua::new();
        let dst = Lua::new();

        let table: Table = src
            .load("return { 1, 2, nested = { x = 'y', [true] = 3 } }")
            .eval()
            .unwrap();
        let copied = copy_value(&dst, &Value::Table(table), DEFAULT_MAX_DEPTH).unwrap();

        dst.globals().set("t", copied).unwrap();
        let ok: bool = dst
            .load("return #t == 2 and t[1] == 1 and t.nested.x == 'y' and t.nested[true] == 3")
            .eval()
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_function_rejected() {
        let src = Lua::new();
        let dst = Lua::new();

        let func = src.create_function(|_, ()| Ok(())).unwrap();
        let err = copy_value(&dst, &Value::Function(func), DEFAULT_MAX_DEPTH).unwrap_err();
        assert_eq!(err.code, codes::ERRARGS);
        assert_eq!(err.message, "cannot exchange <function> value");
    }

    #[test]
    fn test_function_inside_table_rejected() {
        let src = Lua::new();
        let dst = Lua::new();

        let table: Table = src.load("return { ok = 1, f = print }").eval().unwrap();
        let err = copy_value(&dst, &Value::Table(table), DEFAULT_MAX_DEPTH).unwrap_err();
        assert_eq!(err.code, codes::ERRARGS);
        assert!(err.message.contains("function"));
    }

    #[test]
    fn test_cycle_rejected() {
        let src = Lua::new();
        let dst = Lua::new();

        let table: Table = src.load("local t = {} t.self = t return t").eval().unwrap();
        let err = copy_value(&dst, &Value::Table(table), DEFAULT_MAX_DEPTH).unwrap_err();
        assert_eq!(err.code, codes::ERRARGS);
        assert!(err.message.contains("cyclic"));
    }

    #[test]
    fn test_shared_subtable_is_not_a_cycle() {
        let src = Lua::new();
        let dst = Lua::new();

        let table: Table = src
            .load("local s = { 1 } return { a = s, b = s }")
            .eval()
            .unwrap();
        let copied = copy_value(&dst, &Value::Table(table), DEFAULT_MAX_DEPTH).unwrap();
        dst.globals().set("t", copied).unwrap();
        let ok: bool = dst.load("return t.a[1] == 1 and t.b[1] == 1").eval().unwrap();
        assert!(ok);
    }

    #[test]
    fn test_depth_limit() {
        let src = Lua::new();
        let dst = Lua::new();

        let table: Table = src
            .load("local t = {} for _ = 1, 10 do t = { t } end return t")
            .eval()
            .unwrap();
        let value = Value::Table(table);

        assert!(copy_value(&dst, &value, 11).is_ok());
        let err = copy_value(&dst, &value, 10).unwrap_err();
        assert_eq!(err.code, codes::ERRARGS);
        assert!(err.message.contains("deeper than 10"));
    }
}
