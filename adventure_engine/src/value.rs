//! The owned, VM-independent value shape every script result is converted
//! to before it leaves the adapter (see `vm::ScriptVm`).
//!
//! No `mlua::Value`, `mlua::Table`, or `mlua::Function` is ever handed back
//! to a caller outside this crate — everything is flattened into
//! `ScriptValue` first, which is what lets callers hold results past the
//! lifetime of any single VM borrow.

use std::collections::BTreeMap;

/// A value that crossed the boundary from the embedded script runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ScriptValue>),
    Map(BTreeMap<String, ScriptValue>),
    /// A callable was present but not invoked; the adapter never returns a
    /// live handle to it, so only its presence (not its behavior) survives.
    Function,
}

impl ScriptValue {
    /// Lua's `tostring` semantics: `nil` renders as `"nil"`, integral floats
    /// drop their trailing `.0`, strings render unquoted.
    #[must_use]
    pub fn to_lua_string(&self) -> String {
        match self {
            Self::Null => "nil".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_lua_number(*n),
            Self::String(s) => s.clone(),
            Self::Array(_) | Self::Map(_) => "table".to_string(),
            Self::Function => "function".to_string(),
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> bool {
        // Lua truthiness: everything except `nil` and `false` is truthy.
        !matches!(self, Self::Null | Self::Bool(false))
    }
}

fn format_lua_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<mlua::Value> for ScriptValue {
    fn from(value: mlua::Value) -> Self {
        match value {
            mlua::Value::Nil => Self::Null,
            mlua::Value::Boolean(b) => Self::Bool(b),
            mlua::Value::Integer(i) => Self::Number(i as f64),
            mlua::Value::Number(n) => Self::Number(n),
            mlua::Value::String(s) => Self::String(s.to_string_lossy().into_owned()),
            mlua::Value::Table(t) => table_to_script_value(&t),
            mlua::Value::Function(_)
            | mlua::Value::Thread(_)
            | mlua::Value::UserData(_)
            | mlua::Value::LightUserData(_)
            | mlua::Value::Error(_) => Self::Function,
        }
    }
}

fn table_to_script_value(table: &mlua::Table) -> ScriptValue {
    let len = table.raw_len();
    if len > 0 && is_dense_sequence(table, len) {
        let mut items = Vec::with_capacity(len as usize);
        for i in 1..=len {
            let v: mlua::Value = table.get(i).unwrap_or(mlua::Value::Nil);
            items.push(ScriptValue::from(v));
        }
        return ScriptValue::Array(items);
    }

    let mut map = std::collections::BTreeMap::new();
    for pair in table.clone().pairs::<mlua::Value, mlua::Value>() {
        let Ok((key, value)) = pair else { continue };
        if let mlua::Value::String(key) = key {
            map.insert(key.to_string_lossy().into_owned(), ScriptValue::from(value));
        }
        // Non-string keys have no place in the string-keyed map shape this
        // engine works with; they're dropped rather than erroring, since a
        // mixed table is still meaningful to inspect for its string keys.
    }
    ScriptValue::Map(map)
}

fn is_dense_sequence(table: &mlua::Table, len: i64) -> bool {
    let mut count = 0i64;
    for pair in table.clone().pairs::<mlua::Value, mlua::Value>() {
        if pair.is_ok() {
            count += 1;
        }
    }
    count == len
}
