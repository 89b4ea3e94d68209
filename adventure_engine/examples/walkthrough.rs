// A small non-interactive walkthrough of the public API: two pages, a
// scalar carried across template fragments, a conditional action, and a
// transition between the pages. Nothing here reads from stdin; a real
// front-end would render `Engine::render_actions` to a reader and feed
// their choice into `Engine::run_action`.

use adventure_engine::{Engine, EngineConfig};
use std::fs;

fn main() {
    simple_logger::SimpleLogger::new().init().expect("logger init");

    let dir = tempfile::tempdir().expect("temp story dir");

    fs::write(
        dir.path().join("cellar.page"),
        r#"
        config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
        story = {
            "You are standing in a cellar, <[ name = \"traveler\" ]>.",
            "A single lantern hangs from a hook, unlit.",
        }
        actions = {
            light_lantern = {
                text = "Light the lantern",
                cond = "not lantern_lit",
                execute = "lantern_lit = true",
            },
            climb_stairs = {
                text = "Climb the stairs, <[ $name ]>",
                transition_to = "kitchen",
            },
        }
        "#,
    )
    .unwrap();

    fs::write(
        dir.path().join("kitchen.page"),
        r#"
        config = { time_on_screen_ms = 0, transition = "none", transition_time_ms = 0 }
        story = { "You emerge into a warm kitchen, <[ $name ]>." }
        actions = {}
        "#,
    )
    .unwrap();

    let mut engine = Engine::new("cellar-story", EngineConfig::default()).expect("engine setup");

    engine.load_story_page("cellar", dir.path()).unwrap();
    engine.load_story_page("kitchen", dir.path()).unwrap();

    // Rendering the cellar's first section assigns the `name` scalar as a
    // side effect; every later fragment that reads `$name` sees it.
    for line in engine.run_page("cellar").unwrap() {
        println!("{line}");
    }

    println!("--- before lighting the lantern ---");
    for action in engine.render_actions().unwrap() {
        println!("[{}] {}", action.name, action.text);
    }

    engine.run_action("light_lantern").unwrap();

    println!("--- after lighting the lantern ---");
    for action in engine.render_actions().unwrap() {
        println!("[{}] {}", action.name, action.text);
    }

    engine.run_action("climb_stairs").unwrap();
    assert_eq!(engine.current_page().as_deref(), Some("kitchen"));
    for line in engine.run_page("kitchen").unwrap() {
        println!("{line}");
    }
}
