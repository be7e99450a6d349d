//! Component lifecycle integration tests: ordering, deferred add/remove and
//! script error isolation, driven through whole frames.

use aberredcore::game::{Game, HeadlessBackend};
use aberredcore::resources::assets::{ContentError, MemorySource};
use aberredcore::resources::gameconfig::GameConfig;
use mlua::prelude::*;

const TRACER: &str = r#"
LOG = LOG or {}
Tracer = {}
function Tracer:OnStart() table.insert(LOG, self.key .. " start " .. Application.GetFrame()) end
function Tracer:OnUpdate() table.insert(LOG, self.key .. " update " .. Application.GetFrame()) end
function Tracer:OnLateUpdate() table.insert(LOG, self.key .. " late " .. Application.GetFrame()) end
function Tracer:OnDestroy() table.insert(LOG, self.key .. " destroy " .. Application.GetFrame()) end
"#;

fn source(scene: &str) -> MemorySource {
    MemorySource::new()
        .with_manifest(r#"{ "initial_scene": "main" }"#)
        .with_scene("main", scene)
        .with_component("Tracer", TRACER)
}

fn game(source: MemorySource) -> Game {
    Game::new(Box::new(source), &GameConfig::new()).unwrap()
}

fn run_frames(game: &mut Game, n: usize) {
    let mut backend = HeadlessBackend::new(60);
    for _ in 0..n {
        assert!(game.run_frame(&mut backend).unwrap());
    }
}

fn log(game: &Game) -> Vec<String> {
    let lua = game.context().lua();
    match lua.globals().get::<LuaValue>("LOG").unwrap() {
        LuaValue::Table(table) => table
            .sequence_values::<String>()
            .map(|v| v.unwrap())
            .collect(),
        _ => Vec::new(),
    }
}

#[test]
fn callbacks_run_in_lexical_key_order() {
    let mut game = game(source(
        r#"{ "actors": [ { "name": "A", "components": {
            "r2": { "type": "Tracer" },
            "b": { "type": "Tracer" },
            "r10": { "type": "Tracer" },
            "a": { "type": "Tracer" }
        } } ] }"#,
    ));
    run_frames(&mut game, 1);
    let starts: Vec<String> = log(&game)
        .into_iter()
        .filter(|l| l.ends_with("start 0"))
        .collect();
    assert_eq!(
        starts,
        vec!["a start 0", "b start 0", "r10 start 0", "r2 start 0"]
    );
    let updates: Vec<String> = log(&game)
        .into_iter()
        .filter(|l| l.contains(" update "))
        .collect();
    assert_eq!(
        updates,
        vec!["a update 0", "b update 0", "r10 update 0", "r2 update 0"]
    );
}

#[test]
fn passes_run_start_update_late_in_order() {
    let mut game = game(source(
        r#"{ "actors": [ { "name": "A", "components": { "t": { "type": "Tracer" } } } ] }"#,
    ));
    run_frames(&mut game, 2);
    assert_eq!(
        log(&game),
        vec!["t start 0", "t update 0", "t late 0", "t update 1", "t late 1"]
    );
}

#[test]
fn added_component_starts_on_the_next_frame() {
    let spawner = r#"
LOG = LOG or {}
Spawner = {}
function Spawner:OnUpdate()
    if self.done then return end
    self.done = true
    local added = self.actor:AddComponent("Tracer")
    table.insert(LOG, "added " .. added.key .. " at " .. Application.GetFrame())
    table.insert(LOG, "visible " .. tostring(self.actor:GetComponent("Tracer") ~= nil))
end
"#;
    let mut game = game(
        source(r#"{ "actors": [ { "name": "A", "components": { "s": { "type": "Spawner" } } } ] }"#)
            .with_component("Spawner", spawner),
    );
    run_frames(&mut game, 3);
    let lines = log(&game);
    assert_eq!(lines[0], "added r0 at 0");
    assert_eq!(lines[1], "visible false");
    assert_eq!(lines[2], "r0 start 1");
    assert!(lines.contains(&"r0 update 1".to_string()));
    assert!(!lines.iter().any(|l| l.ends_with(" 0") && l.starts_with("r0 ")));
}

#[test]
fn removed_component_is_hidden_at_once_and_destroyed_at_flush() {
    let remover = r#"
LOG = LOG or {}
Remover = {}
function Remover:OnUpdate()
    if self.done then return end
    self.done = true
    local target = self.actor:GetComponentByKey("t")
    self.actor:RemoveComponent(target)
    self.actor:RemoveComponent(target)
    table.insert(LOG, "after remove " .. tostring(self.actor:GetComponent("Tracer"))
        .. " " .. #self.actor:GetComponents("Tracer"))
end
"#;
    let mut game = game(
        source(
            r#"{ "actors": [ { "name": "A", "components": {
                "a": { "type": "Remover" },
                "t": { "type": "Tracer" }
            } } ] }"#,
        )
        .with_component("Remover", remover),
    );
    run_frames(&mut game, 3);
    assert_eq!(
        log(&game),
        vec!["t start 0", "after remove nil 0", "t destroy 0"]
    );
}

#[test]
fn removing_a_pending_component_never_starts_it() {
    let fickle = r#"
LOG = LOG or {}
Fickle = {}
function Fickle:OnUpdate()
    if self.done then return end
    self.done = true
    local added = self.actor:AddComponent("Tracer")
    self.actor:RemoveComponent(added)
end
"#;
    let mut game = game(
        source(r#"{ "actors": [ { "name": "A", "components": { "f": { "type": "Fickle" } } } ] }"#)
            .with_component("Fickle", fickle),
    );
    run_frames(&mut game, 3);
    assert!(log(&game).is_empty());
}

#[test]
fn disabled_mid_pass_is_skipped() {
    let disabler = r#"
Disabler = {}
function Disabler:OnUpdate()
    self.actor:GetComponentByKey("t").enabled = false
end
"#;
    let mut game = game(
        source(
            r#"{ "actors": [ { "name": "A", "components": {
                "a": { "type": "Disabler" },
                "t": { "type": "Tracer" }
            } } ] }"#,
        )
        .with_component("Disabler", disabler),
    );
    run_frames(&mut game, 2);
    assert_eq!(log(&game), vec!["t start 0"]);
}

#[test]
fn disabled_component_does_not_start() {
    let mut game = game(source(
        r#"{ "actors": [ { "name": "A", "components": {
            "t": { "type": "Tracer", "enabled": false }
        } } ] }"#,
    ));
    run_frames(&mut game, 2);
    assert!(log(&game).is_empty());
}

#[test]
fn script_errors_do_not_stop_the_frame() {
    let broken = r#"
Broken = {}
function Broken:OnUpdate() error("boom") end
"#;
    let mut game = game(
        source(
            r#"{ "actors": [
                { "name": "A", "components": { "a": { "type": "Broken" }, "t": { "type": "Tracer" } } },
                { "name": "B", "components": { "u": { "type": "Tracer" } } }
            ] }"#,
        )
        .with_component("Broken", broken),
    );
    run_frames(&mut game, 2);
    let lines = log(&game);
    assert!(lines.contains(&"t update 1".to_string()));
    assert!(lines.contains(&"u update 1".to_string()));
    let enabled: bool = game
        .context()
        .lua()
        .load("return Actor.Find('A'):GetComponentByKey('a') ~= nil")
        .eval()
        .unwrap();
    assert!(enabled);
}

#[test]
fn missing_component_type_is_fatal() {
    let greedy = r#"
Greedy = {}
function Greedy:OnUpdate() self.actor:AddComponent("Nowhere") end
"#;
    let mut game = game(
        source(r#"{ "actors": [ { "name": "A", "components": { "g": { "type": "Greedy" } } } ] }"#)
            .with_component("Greedy", greedy),
    );
    let mut backend = HeadlessBackend::new(60);
    assert_eq!(
        game.run_frame(&mut backend),
        Err(ContentError::MissingComponentType("Nowhere".to_string()))
    );
}

#[test]
fn quit_stops_the_loop() {
    let quitter = r#"
Quitter = {}
function Quitter:OnUpdate()
    if Application.GetFrame() == 2 then Application.Quit() end
end
"#;
    let mut game = game(
        source(r#"{ "actors": [ { "name": "A", "components": { "q": { "type": "Quitter" } } } ] }"#)
            .with_component("Quitter", quitter),
    );
    let mut backend = HeadlessBackend::new(60).with_frame_limit(100);
    game.run(&mut backend).unwrap();
    assert_eq!(backend.frames(), 3);
}

fn destroy_count(lines: &[String], key: &str) -> usize {
    let expected = format!("{} destroy ", key);
    lines.iter().filter(|l| l.starts_with(&expected)).count()
}

#[test]
fn remove_then_destroy_fires_on_destroy_once() {
    let killer = r#"
Killer = {}
function Killer:OnUpdate()
    local target = self.actor:GetComponentByKey("t")
    self.actor:RemoveComponent(target)
    Actor.Destroy(self.actor)
end
"#;
    let mut game = game(
        source(
            r#"{ "actors": [ { "name": "A", "components": {
                "a": { "type": "Killer" },
                "t": { "type": "Tracer" },
                "u": { "type": "Tracer" }
            } } ] }"#,
        )
        .with_component("Killer", killer),
    );
    run_frames(&mut game, 3);
    let lines = log(&game);
    assert_eq!(destroy_count(&lines, "t"), 1);
    assert_eq!(destroy_count(&lines, "u"), 1);
    assert!(game.context().scene.borrow().find("A").is_none());
}

#[test]
fn destroy_then_remove_fires_on_destroy_once() {
    let killer = r#"
Killer = {}
function Killer:OnUpdate()
    local target = self.actor:GetComponentByKey("t")
    Actor.Destroy(self.actor)
    self.actor:RemoveComponent(target)
end
"#;
    let mut game = game(
        source(
            r#"{ "actors": [ { "name": "A", "components": {
                "a": { "type": "Killer" },
                "t": { "type": "Tracer" }
            } } ] }"#,
        )
        .with_component("Killer", killer),
    );
    run_frames(&mut game, 3);
    assert_eq!(destroy_count(&log(&game), "t"), 1);
}

#[test]
fn zero_burst_interval_set_by_script_keeps_running() {
    let breaker = r#"
Breaker = {}
function Breaker:OnStart()
    local ps = self.actor:GetComponent("ParticleSystem")
    ps.frames_between_bursts = 0
    ps.burst_quantity = 0
    ps.duration_frames = -3
end
"#;
    let mut game = game(
        source(
            r#"{ "actors": [ { "name": "A", "components": {
                "ps": { "type": "ParticleSystem" },
                "z": { "type": "Breaker" }
            } } ] }"#,
        )
        .with_component("Breaker", breaker),
    );
    run_frames(&mut game, 3);
    let interval: i64 = game
        .context()
        .lua()
        .load("return Actor.Find('A'):GetComponent('ParticleSystem').frames_between_bursts")
        .eval()
        .unwrap();
    assert_eq!(interval, 1);
}
