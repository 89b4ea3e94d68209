//! The page state machine: `Idle -> PageLoaded(p) -> PageRunning(p)`, driven
//! by loading pages, running one, listing its visible actions, and firing
//! one of them.

use crate::error::EngineError;
use crate::page::{self, Action, Page};
use crate::render;
use crate::value::ScriptValue;
use crate::vm::{EvalMode, EvalOutcome, ScriptVm};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Mirrors the three directory keys a host's config loader recognizes
/// (`story_dir`, `lua_dir`, `html_dir`); all optional, defaulting to empty.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct EngineConfig {
    pub story_dir: Option<PathBuf>,
    pub lua_dir: Option<PathBuf>,
    pub html_dir: Option<PathBuf>,
}

/// An action as offered to the reader: its name and already-rendered text.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedAction {
    pub name: String,
    pub text: String,
}

/// The process-wide engine state: one `ScriptVm`, the loaded page map, and
/// the current position in the story. Not `Sync` — the `ScriptVm` it owns
/// is not re-entrant, so all operations are expected to run on one thread.
pub struct Engine {
    vm: ScriptVm,
    pages: BTreeMap<String, Page>,
    current_page: Rc<RefCell<Option<String>>>,
    story_name: String,
    story_dir: PathBuf,
    lua_dir: PathBuf,
    html_dir: Option<PathBuf>,
}

impl Engine {
    /// Creates an engine for `story_name`. Loads `config.lua_dir/*.lua` at
    /// global scope, then `config.story_dir/story_name/lua/*.lua` into the
    /// story environment, in that order (so a story script only shadows a
    /// global name within its own environment, never globally).
    pub fn new(story_name: impl Into<String>, config: EngineConfig) -> Result<Self, EngineError> {
        let story_name = story_name.into();
        let current_page = Rc::new(RefCell::new(None));
        let ssp_target = current_page.clone();
        let vm = ScriptVm::new(move |page_name| *ssp_target.borrow_mut() = Some(page_name))?;

        let story_dir = config.story_dir.unwrap_or_default();
        let lua_dir = config.lua_dir.unwrap_or_default();

        for path in scripts_in(&lua_dir)? {
            log::info!("loading shared script {}", path.display());
            vm.load_file_global(&path)?;
        }

        let story_lua_dir = story_dir.join(&story_name).join("lua");
        for path in scripts_in(&story_lua_dir)? {
            log::info!("loading story script {} into '{story_name}'", path.display());
            vm.load_file_in_env(&story_name, "engine", &path)?;
        }

        Ok(Self {
            vm,
            pages: BTreeMap::new(),
            current_page,
            story_name,
            story_dir,
            lua_dir,
            html_dir: config.html_dir,
        })
    }

    #[must_use]
    pub fn story_name(&self) -> &str {
        &self.story_name
    }

    #[must_use]
    pub fn story_dir(&self) -> &Path {
        &self.story_dir
    }

    #[must_use]
    pub fn lua_dir(&self) -> &Path {
        &self.lua_dir
    }

    #[must_use]
    pub fn html_dir(&self) -> Option<&Path> {
        self.html_dir.as_deref()
    }

    #[must_use]
    pub fn current_page(&self) -> Option<String> {
        self.current_page.borrow().clone()
    }

    #[must_use]
    pub fn is_page_loaded(&self, page_name: &str) -> bool {
        self.pages.contains_key(page_name)
    }

    /// Reads `<dir>/<page_name>.page`, executes it in a fresh `page_name`
    /// environment, and stores the resulting `Page`. A page of the same
    /// name already loaded is overwritten. `current_page` is untouched.
    pub fn load_story_page(&mut self, page_name: &str, dir: &Path) -> Result<(), EngineError> {
        let path = dir.join(format!("{page_name}.page"));
        let page = page::load(&self.vm, page_name, &path)?;
        self.pages.insert(page_name.to_string(), page);
        Ok(())
    }

    /// Renders the named, already-loaded page's sections in order and sets
    /// it as `current_page`.
    pub fn run_page(&mut self, page_name: &str) -> Result<Vec<String>, EngineError> {
        let page = self.pages.get(page_name).ok_or_else(|| EngineError::UnknownPage(page_name.to_string()))?;
        let mut rendered = Vec::with_capacity(page.sections.len());
        for section in &page.sections {
            rendered.push(render::render(section, &self.vm)?);
        }
        *self.current_page.borrow_mut() = Some(page_name.to_string());
        Ok(rendered)
    }

    /// Evaluates every action's `cond` on the current page against the
    /// story environment, drops the ones that fail, renders the rest, and
    /// returns them sorted by action name ascending.
    pub fn render_actions(&self) -> Result<Vec<RenderedAction>, EngineError> {
        let page = self.current_page_ref()?;

        let mut visible: Vec<(&String, &Action)> = Vec::new();
        for (name, action) in &page.actions {
            if self.condition_holds(action)? {
                visible.push((name, action));
            }
        }
        visible.sort_by(|a, b| a.0.cmp(b.0));

        visible
            .into_iter()
            .map(|(name, action)| {
                Ok(RenderedAction { name: name.clone(), text: render::render(&action.text, &self.vm)? })
            })
            .collect()
    }

    /// Fires `action_name` on the current page: cond-check, then execute,
    /// then transition, in that order. If `execute` fails, no transition
    /// happens; side effects already written are not rolled back.
    pub fn run_action(&mut self, action_name: &str) -> Result<(), EngineError> {
        let page_name = self.current_page_name()?;
        let action = self
            .pages
            .get(&page_name)
            .expect("current_page always names a loaded page")
            .actions
            .get(action_name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownAction { page: page_name.clone(), action: action_name.to_string() })?;

        if !self.condition_holds(&action)? {
            return Err(EngineError::ConditionNotMet(action_name.to_string()));
        }

        if let Some(execute) = &action.execute {
            self.vm.eval_in_env_as(&self.story_name, "engine", execute, EvalMode::Statement)?;
        }

        if let Some(target) = &action.transition_to {
            if !self.pages.contains_key(target) {
                return Err(EngineError::UnknownPage(target.clone()));
            }
            *self.current_page.borrow_mut() = Some(target.clone());
        }

        Ok(())
    }

    /// Parses `text` as a bare `call` (legacy interactive-mode dispatch,
    /// distinct from the page-authored `Action` records) and evaluates it
    /// against the story environment.
    pub fn eval_action_call(&self, text: &str) -> Result<ScriptValue, EngineError> {
        let call = adventure_parser::parse_call(text)?;
        render::eval_call(&call, &self.vm)
    }

    fn current_page_name(&self) -> Result<String, EngineError> {
        self.current_page().ok_or_else(|| EngineError::UnknownPage("<no current page>".to_string()))
    }

    fn current_page_ref(&self) -> Result<&Page, EngineError> {
        let page_name = self.current_page_name()?;
        self.pages.get(&page_name).ok_or(EngineError::UnknownPage(page_name))
    }

    fn condition_holds(&self, action: &Action) -> Result<bool, EngineError> {
        match &action.cond {
            None => Ok(true),
            Some(cond) => match self.vm.eval_in_env_as(&self.story_name, "engine", cond, EvalMode::ExprBool)? {
                EvalOutcome::Bool(b) => Ok(b),
                other => Err(EngineError::TypeError {
                    context: format!("action condition '{cond}'"),
                    expected: "boolean",
                    found: format!("{other:?}"),
                }),
            },
        }
    }
}

fn scripts_in(dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    if dir.as_os_str().is_empty() || !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| EngineError::Load { path: dir.to_path_buf(), source })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| EngineError::Load { path: dir.to_path_buf(), source })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("lua") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_page(dir: &Path, name: &str, body: &str) {
        let mut f = std::fs::File::create(dir.join(format!("{name}.page"))).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    fn test_engine() -> (Engine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new("test_story", EngineConfig::default()).unwrap();
        (engine, dir)
    }

    #[test]
    fn conditional_action_appears_after_story_mutation() {
        let (mut engine, dir) = test_engine();
        write_page(
            dir.path(),
            "room",
            r#"
            config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
            story = { "A dark room." }
            actions = { light_candle = { text = "Light the candle", cond = "inventory and inventory.candle" } }
            "#,
        );
        engine.load_story_page("room", dir.path()).unwrap();
        engine.run_page("room").unwrap();

        assert!(engine.render_actions().unwrap().is_empty());

        engine.vm.eval_in_env_as("test_story", "engine", "inventory = { candle = true }", EvalMode::Statement).unwrap();

        let visible = engine.render_actions().unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "light_candle");
    }

    #[test]
    fn transition_moves_current_page_and_no_transition_leaves_it() {
        let (mut engine, dir) = test_engine();
        write_page(
            dir.path(),
            "first",
            r#"
            config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
            story = { "You can let go or hold tight." }
            actions = {
                let_go = { text = "Let go", transition_to = "second" },
                reload = { text = "Stay put" },
            }
            "#,
        );
        write_page(
            dir.path(),
            "second",
            r#"
            config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
            story = { "You fall." }
            actions = { hold_hand = { text = "Grab on", transition_to = "first" } }
            "#,
        );
        engine.load_story_page("first", dir.path()).unwrap();
        engine.load_story_page("second", dir.path()).unwrap();
        engine.run_page("first").unwrap();

        engine.run_action("reload").unwrap();
        assert_eq!(engine.current_page().as_deref(), Some("first"));

        engine.run_action("let_go").unwrap();
        assert_eq!(engine.current_page().as_deref(), Some("second"));

        engine.run_action("hold_hand").unwrap();
        assert_eq!(engine.current_page().as_deref(), Some("first"));
    }

    #[test]
    fn running_an_unknown_action_fails() {
        let (mut engine, dir) = test_engine();
        write_page(
            dir.path(),
            "room",
            r#"
            config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
            story = {}
            actions = {}
            "#,
        );
        engine.load_story_page("room", dir.path()).unwrap();
        engine.run_page("room").unwrap();
        assert!(matches!(engine.run_action("nonexistent"), Err(EngineError::UnknownAction { .. })));
    }
}
