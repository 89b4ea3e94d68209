//! End-to-end coverage for the page state machine, exercised through the
//! public `Engine` API against on-disk page fixtures.

use adventure_engine::{Engine, EngineConfig, EngineError};
use std::fs;
use std::path::Path;

fn write_page(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(format!("{name}.page")), body).unwrap();
}

#[test]
fn full_story_loads_runs_and_transitions() {
    let dir = tempfile::tempdir().unwrap();

    write_page(
        dir.path(),
        "porch",
        r#"
        config = { time_on_screen_ms = 500, transition = "fade", transition_time_ms = 250 }
        story = {
            "The porch creaks, <[ name = \"Nadia\" ]>.",
            "Sequence check: <[ 1; 2; 3 ]>.",
        }
        actions = {
            knock = { text = "Knock on the door", transition_to = "hall" },
            leave = { text = "Walk away" },
        }
        "#,
    );
    write_page(
        dir.path(),
        "hall",
        r#"
        config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
        story = { "<[ $name ]> steps into the hall." }
        actions = {}
        "#,
    );

    let mut engine = Engine::new("porch-story", EngineConfig::default()).unwrap();
    engine.load_story_page("porch", dir.path()).unwrap();
    engine.load_story_page("hall", dir.path()).unwrap();

    let porch_lines = engine.run_page("porch").unwrap();
    assert_eq!(porch_lines[0], "The porch creaks, Nadia.");
    assert_eq!(porch_lines[1], "Sequence check: 3.");

    let actions = engine.render_actions().unwrap();
    let names: Vec<&str> = actions.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["knock", "leave"]); // sorted ascending

    engine.run_action("leave").unwrap();
    assert_eq!(engine.current_page().as_deref(), Some("porch"));

    engine.run_action("knock").unwrap();
    assert_eq!(engine.current_page().as_deref(), Some("hall"));

    let hall_lines = engine.run_page("hall").unwrap();
    assert_eq!(hall_lines[0], "Nadia steps into the hall.");
}

#[test]
fn missing_scalar_ref_renders_nil() {
    let dir = tempfile::tempdir().unwrap();
    write_page(
        dir.path(),
        "vault",
        r#"
        config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
        story = { "Balance: <[ $missing ]>" }
        actions = {}
        "#,
    );
    let mut engine = Engine::new("vault-story", EngineConfig::default()).unwrap();
    engine.load_story_page("vault", dir.path()).unwrap();
    let lines = engine.run_page("vault").unwrap();
    assert_eq!(lines[0], "Balance: nil");
}

#[test]
fn malformed_page_is_rejected_and_leaves_page_map_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    write_page(
        dir.path(),
        "broken",
        r#"
        config = { time_on_screen_ms = 0 }
        story = {}
        actions = {}
        "#,
    );
    let mut engine = Engine::new("broken-story", EngineConfig::default()).unwrap();
    let err = engine.load_story_page("broken", dir.path()).unwrap_err();
    assert!(matches!(err, EngineError::PageShape { .. }));
    assert!(!engine.is_page_loaded("broken"));
}

#[test]
fn running_action_with_unmet_condition_fails_without_transitioning() {
    let dir = tempfile::tempdir().unwrap();
    write_page(
        dir.path(),
        "gate",
        r#"
        config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
        story = { "A locked gate." }
        actions = {
            open = { text = "Open the gate", cond = "has_key", transition_to = "beyond" },
        }
        "#,
    );
    write_page(
        dir.path(),
        "beyond",
        r#"
        config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
        story = { "Beyond the gate." }
        actions = {}
        "#,
    );
    let mut engine = Engine::new("gate-story", EngineConfig::default()).unwrap();
    engine.load_story_page("gate", dir.path()).unwrap();
    engine.load_story_page("beyond", dir.path()).unwrap();
    engine.run_page("gate").unwrap();

    assert!(engine.render_actions().unwrap().is_empty());
    let err = engine.run_action("open").unwrap_err();
    assert!(matches!(err, EngineError::ConditionNotMet(_)));
    assert_eq!(engine.current_page().as_deref(), Some("gate"));
}

#[test]
fn unloaded_transition_target_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_page(
        dir.path(),
        "start",
        r#"
        config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
        story = { "The beginning." }
        actions = { go = { text = "Go onward", transition_to = "nowhere" } }
        "#,
    );
    let mut engine = Engine::new("dangling-story", EngineConfig::default()).unwrap();
    engine.load_story_page("start", dir.path()).unwrap();
    engine.run_page("start").unwrap();

    let err = engine.run_action("go").unwrap_err();
    assert!(matches!(err, EngineError::UnknownPage(_)));
    assert_eq!(engine.current_page().as_deref(), Some("start"));
}

#[test]
fn legacy_interactive_action_call_dispatches_a_global_function() {
    let dir = tempfile::tempdir().unwrap();
    let lua_dir = dir.path().join("lua");
    fs::create_dir_all(&lua_dir).unwrap();
    fs::write(lua_dir.join("helpers.lua"), "function go_north() return \"north\" end").unwrap();

    let engine = Engine::new("helpers-story", EngineConfig { lua_dir: Some(lua_dir), ..Default::default() }).unwrap();
    let result = engine.eval_action_call("go_north()").unwrap();
    assert_eq!(result.to_lua_string(), "north");
}
