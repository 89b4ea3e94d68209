//! Adapter over the embedded Lua runtime (`mlua`).
//!
//! Every public method here returns owned data — `()`, `bool`, `String`, or
//! `ScriptValue` — never an `mlua::Table`/`mlua::Value`/`mlua::Function`.
//! That is the concrete replacement for the "stack depth is preserved"
//! discipline this adapter is modeled on: nothing borrowed from the `Lua`
//! instance can escape a call and be misused later (§6b of the design).

use crate::error::VmError;
use crate::value::ScriptValue;
use std::fs;
use std::path::Path;

/// How a fragment of authored code should be evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalMode {
    /// Run as a statement; no result is read back.
    Statement,
    /// Run as `return <code>`, then stringify the result.
    ExprString,
    /// Run as `return <code>`, then interpret the result by Lua truthiness.
    ExprBool,
}

/// The result of `ScriptVm::eval_in_env_as`, shaped by the `EvalMode` used.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalOutcome {
    None,
    Str(String),
    Bool(bool),
}

/// A thin, handle-safe wrapper over one embedded `mlua::Lua` instance.
///
/// Not `Sync`: the engine that owns this is expected to serialize all access
/// from a single thread (§5 of the design).
pub struct ScriptVm {
    lua: mlua::Lua,
}

impl ScriptVm {
    /// Creates a fresh VM and registers `SSP`, the engine's story-page
    /// transition escape hatch, as a global function.
    ///
    /// `on_set_story_page` is called with the requested page name whenever
    /// authored code invokes `engine.SSP(page_name)` (reachable from inside
    /// a page environment through that environment's `"engine"` parent
    /// back-reference, which points at this VM's global scope).
    pub fn new(on_set_story_page: impl Fn(String) + 'static) -> Result<Self, VmError> {
        let lua = mlua::Lua::new();
        let ssp = lua
            .create_function(move |_, page_name: String| {
                on_set_story_page(page_name);
                Ok(())
            })
            .map_err(|e| VmError::from_lua("<global>", e))?;
        lua.globals()
            .set("SSP", ssp)
            .map_err(|e| VmError::from_lua("<global>", e))?;
        Ok(Self { lua })
    }

    /// Executes a script file at the top-level (`_G`) scope.
    pub fn load_file_global(&self, path: &Path) -> Result<(), VmError> {
        let src = read_file(path)?;
        self.lua
            .load(&src)
            .set_name(path.display().to_string())
            .exec()
            .map_err(|e| VmError::from_lua("<global>", e))
    }

    /// Resolves (creating if absent) the environment table canonically named
    /// `environment_<env_name>`, installing `parent_name -> _G` on creation.
    pub fn get_or_create_env(&self, env_name: &str, parent_name: &str) -> Result<mlua::Table, VmError> {
        let key = environment_key(env_name);
        let globals = self.lua.globals();
        if let Some(existing) = globals
            .get::<_, Option<mlua::Table>>(key.clone())
            .map_err(|e| VmError::from_lua(env_name, e))?
        {
            return Ok(existing);
        }
        let table = self.lua.create_table().map_err(|e| VmError::from_lua(env_name, e))?;
        table
            .set(parent_name, globals.clone())
            .map_err(|e| VmError::from_lua(env_name, e))?;
        globals
            .set(key, table.clone())
            .map_err(|e| VmError::from_lua(env_name, e))?;
        Ok(table)
    }

    /// Parses a file, binds its chunk's environment to `env_name` (with
    /// `parent_name` installed as the back-reference key), and executes it.
    pub fn load_file_in_env(&self, env_name: &str, parent_name: &str, path: &Path) -> Result<(), VmError> {
        let env = self.get_or_create_env(env_name, parent_name)?;
        let src = read_file(path)?;
        self.lua
            .load(&src)
            .set_name(path.display().to_string())
            .set_environment(env)
            .exec()
            .map_err(|e| VmError::from_lua(env_name, e))
    }

    /// Evaluates `code` inside the named environment, in the given mode.
    pub fn eval_in_env_as(
        &self,
        env_name: &str,
        parent_name: &str,
        code: &str,
        mode: EvalMode,
    ) -> Result<EvalOutcome, VmError> {
        let env = self.get_or_create_env(env_name, parent_name)?;
        let chunk_name = format!("<{env_name}>");
        match mode {
            EvalMode::Statement => {
                self.lua
                    .load(code)
                    .set_name(chunk_name)
                    .set_environment(env)
                    .exec()
                    .map_err(|e| VmError::from_lua(env_name, e))?;
                Ok(EvalOutcome::None)
            }
            EvalMode::ExprString => {
                let src = format!("return {code}");
                let value: mlua::Value = self
                    .lua
                    .load(&src)
                    .set_name(chunk_name)
                    .set_environment(env)
                    .eval()
                    .map_err(|e| VmError::from_lua(env_name, e))?;
                Ok(EvalOutcome::Str(ScriptValue::from(value).to_lua_string()))
            }
            EvalMode::ExprBool => {
                let src = format!("return {code}");
                let value: mlua::Value = self
                    .lua
                    .load(&src)
                    .set_name(chunk_name)
                    .set_environment(env)
                    .eval()
                    .map_err(|e| VmError::from_lua(env_name, e))?;
                Ok(EvalOutcome::Bool(ScriptValue::from(value).as_bool()))
            }
        }
    }

    /// Reads `scalars[name]` from the global `scalars` table, yielding
    /// `ScriptValue::Null` if the table or the field is absent.
    pub fn read_scalar(&self, name: &str) -> Result<ScriptValue, VmError> {
        let scalars: Option<mlua::Table> = self
            .lua
            .globals()
            .get("scalars")
            .map_err(|e| VmError::from_lua("<global>", e))?;
        let Some(scalars) = scalars else { return Ok(ScriptValue::Null) };
        let value: mlua::Value = scalars.get(name).map_err(|e| VmError::from_lua("scalars", e))?;
        Ok(ScriptValue::from(value))
    }

    /// Writes `scalars[name] = value`, creating the `scalars` table if
    /// needed.
    pub fn write_scalar(&self, name: &str, value: ScriptValue) -> Result<(), VmError> {
        let globals = self.lua.globals();
        let scalars: mlua::Table = match globals.get("scalars").map_err(|e| VmError::from_lua("<global>", e))? {
            mlua::Value::Table(t) => t,
            _ => {
                let t = self.lua.create_table().map_err(|e| VmError::from_lua("scalars", e))?;
                globals.set("scalars", t.clone()).map_err(|e| VmError::from_lua("scalars", e))?;
                t
            }
        };
        scalars
            .set(name, script_value_to_lua(&self.lua, value))
            .map_err(|e| VmError::from_lua("scalars", e))
    }

    /// Calls a global function by name with already-evaluated arguments,
    /// returning its first result.
    pub fn call_global(&self, name: &str, args: Vec<ScriptValue>) -> Result<ScriptValue, VmError> {
        let value: mlua::Value = self.lua.globals().get(name).map_err(|e| VmError::from_lua("<global>", e))?;
        let mlua::Value::Function(func) = value else {
            return Err(VmError::Runtime {
                env: "<global>".to_string(),
                message: format!("'{name}' is not a function"),
            });
        };
        let lua_args: Vec<mlua::Value> = args.into_iter().map(|v| script_value_to_lua(&self.lua, v)).collect();
        let result: mlua::Value = func
            .call(mlua::MultiValue::from_iter(lua_args))
            .map_err(|e| VmError::from_lua(name, e))?;
        Ok(ScriptValue::from(result))
    }

    /// Like `read_table`, but starts from the named environment table
    /// itself rather than a field of `_G`. Used by the page loader to pull
    /// `config`/`story`/`actions` back out of a just-executed page chunk.
    pub fn read_env_table(&self, env_name: &str, path: &[&str]) -> Result<ScriptValue, VmError> {
        let env = self.get_or_create_env(env_name, "engine")?;
        let mut current = mlua::Value::Table(env);
        for segment in path {
            current = match current {
                mlua::Value::Table(t) => t.get(*segment).map_err(|e| VmError::from_lua(segment, e))?,
                mlua::Value::Nil => mlua::Value::Nil,
                _ => {
                    return Err(VmError::Runtime {
                        env: env_name.to_string(),
                        message: format!("'{segment}' is not reachable through a non-table value"),
                    })
                }
            };
        }
        Ok(ScriptValue::from(current))
    }

    /// Traverses nested fields of a named global table, returning the whole
    /// subtree as an owned `ScriptValue`.
    pub fn read_table(&self, path: &[&str]) -> Result<ScriptValue, VmError> {
        let Some((&head, rest)) = path.split_first() else {
            return Ok(ScriptValue::Null);
        };
        let mut current: mlua::Value = self.lua.globals().get(head).map_err(|e| VmError::from_lua(head, e))?;
        for segment in rest {
            current = match current {
                mlua::Value::Table(t) => t.get(*segment).map_err(|e| VmError::from_lua(segment, e))?,
                mlua::Value::Nil => mlua::Value::Nil,
                _ => {
                    return Err(VmError::Runtime {
                        env: head.to_string(),
                        message: format!("'{segment}' is not reachable through a non-table value"),
                    })
                }
            };
        }
        Ok(ScriptValue::from(current))
    }
}

fn script_value_to_lua(lua: &mlua::Lua, value: ScriptValue) -> mlua::Value {
    match value {
        ScriptValue::Null | ScriptValue::Function => mlua::Value::Nil,
        ScriptValue::Bool(b) => mlua::Value::Boolean(b),
        ScriptValue::Number(n) => mlua::Value::Number(n),
        ScriptValue::String(s) => mlua::Value::String(lua.create_string(&s).expect("string allocation")),
        ScriptValue::Array(items) => {
            let table = lua.create_table().expect("table allocation");
            for (i, item) in items.into_iter().enumerate() {
                let _ = table.set(i as i64 + 1, script_value_to_lua(lua, item));
            }
            mlua::Value::Table(table)
        }
        ScriptValue::Map(map) => {
            let table = lua.create_table().expect("table allocation");
            for (key, item) in map {
                let _ = table.set(key, script_value_to_lua(lua, item));
            }
            mlua::Value::Table(table)
        }
    }
}

fn environment_key(env_name: &str) -> String {
    format!("environment_{env_name}")
}

fn read_file(path: &Path) -> Result<String, VmError> {
    fs::read_to_string(path).map_err(|source| VmError::Io { path: path.to_path_buf(), source })
}
