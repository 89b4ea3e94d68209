//! The page data model and the loader that builds it from an executed page
//! environment.

use crate::error::EngineError;
use crate::value::ScriptValue;
use crate::vm::ScriptVm;
use std::collections::BTreeMap;
use std::path::Path;

/// Rendering hints carried by every page; the loader requires all three
/// fields to be present.
#[derive(Clone, Debug, PartialEq)]
pub struct PageConfig {
    pub time_on_screen_ms: f64,
    pub transition: String,
    pub transition_time_ms: f64,
}

/// One offered choice on a page.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Action {
    pub text: String,
    pub cond: Option<String>,
    pub execute: Option<String>,
    pub transition_to: Option<String>,
}

/// An immutable, loaded story page.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub sections: Vec<String>,
    pub actions: BTreeMap<String, Action>,
    pub config: PageConfig,
}

/// Executes `path` inside the environment named `page_name` (parented to
/// `"engine"`) and harvests `config`/`story`/`actions` into a `Page`.
pub(crate) fn load(vm: &ScriptVm, page_name: &str, path: &Path) -> Result<Page, EngineError> {
    log::debug!("loading page '{page_name}' from {}", path.display());
    vm.load_file_in_env(page_name, "engine", path)?;

    let config_map = expect_map(vm.read_env_table(page_name, &["config"])?, page_name, "config")?;
    let config = build_config(page_name, &config_map)?;

    let sections = match vm.read_env_table(page_name, &["story"])? {
        ScriptValue::Array(items) => build_sections(page_name, items)?,
        ScriptValue::Map(m) if m.is_empty() => Vec::new(),
        other => return Err(shape_err(page_name, format!("'story' is not an array (found {})", describe(&other)))),
    };

    let actions_map = expect_map(vm.read_env_table(page_name, &["actions"])?, page_name, "actions")?;
    let mut actions = BTreeMap::new();
    for (name, value) in actions_map {
        let action = build_action(page_name, &name, value)?;
        actions.insert(name, action);
    }

    log::info!("loaded page '{page_name}' ({} sections, {} actions)", sections.len(), actions.len());
    Ok(Page { sections, actions, config })
}

fn shape_err(page: &str, reason: impl Into<String>) -> EngineError {
    EngineError::PageShape { page: page.to_string(), reason: reason.into() }
}

fn describe(value: &ScriptValue) -> &'static str {
    match value {
        ScriptValue::Null => "nil",
        ScriptValue::Bool(_) => "boolean",
        ScriptValue::Number(_) => "number",
        ScriptValue::String(_) => "string",
        ScriptValue::Array(_) => "array",
        ScriptValue::Map(_) => "table",
        ScriptValue::Function => "function",
    }
}

fn expect_map(value: ScriptValue, page: &str, what: &str) -> Result<BTreeMap<String, ScriptValue>, EngineError> {
    match value {
        ScriptValue::Map(m) => Ok(m),
        // An empty Lua table has no string keys to distinguish it from an
        // empty array; treat it as an empty map here.
        ScriptValue::Array(a) if a.is_empty() => Ok(BTreeMap::new()),
        other => Err(shape_err(page, format!("'{what}' is not a table (found {})", describe(&other)))),
    }
}

fn build_config(page: &str, map: &BTreeMap<String, ScriptValue>) -> Result<PageConfig, EngineError> {
    Ok(PageConfig {
        time_on_screen_ms: expect_number_field(map, page, "config", "time_on_screen_ms")?,
        transition: expect_string_field(map, page, "config", "transition")?,
        transition_time_ms: expect_number_field(map, page, "config", "transition_time_ms")?,
    })
}

fn build_sections(page: &str, items: Vec<ScriptValue>) -> Result<Vec<String>, EngineError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| match v {
            ScriptValue::String(s) => Ok(s),
            other => Err(shape_err(page, format!("story[{}] is not a string (found {})", i + 1, describe(&other)))),
        })
        .collect()
}

fn build_action(page: &str, name: &str, value: ScriptValue) -> Result<Action, EngineError> {
    let map = expect_map(value, page, &format!("actions.{name}"))?;
    let scope = format!("actions.{name}");
    Ok(Action {
        text: expect_string_field(&map, page, &scope, "text")?,
        cond: optional_string_field(&map, "cond"),
        execute: optional_string_field(&map, "execute"),
        transition_to: optional_string_field(&map, "transition_to"),
    })
}

fn expect_number_field(map: &BTreeMap<String, ScriptValue>, page: &str, scope: &str, key: &str) -> Result<f64, EngineError> {
    match map.get(key) {
        Some(ScriptValue::Number(n)) => Ok(*n),
        Some(other) => Err(shape_err(page, format!("{scope}.{key} is not a number (found {})", describe(other)))),
        None => Err(shape_err(page, format!("{scope}.{key} is missing"))),
    }
}

fn expect_string_field(map: &BTreeMap<String, ScriptValue>, page: &str, scope: &str, key: &str) -> Result<String, EngineError> {
    match map.get(key) {
        Some(ScriptValue::String(s)) => Ok(s.clone()),
        Some(other) => Err(shape_err(page, format!("{scope}.{key} is not a string (found {})", describe(other)))),
        None => Err(shape_err(page, format!("{scope}.{key} is missing"))),
    }
}

fn optional_string_field(map: &BTreeMap<String, ScriptValue>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(ScriptValue::String(s)) => Some(s.clone()),
        _ => None,
    }
}
