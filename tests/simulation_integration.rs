//! End-to-end tests: scenarios loaded from JSON, scripted in Lua and run
//! turn by turn through `Simulation`.
//!
//! # Usage
//!
//! ```sh
//! cargo test --test simulation_integration
//! ```

use gridbots::components::entity::EntityId;
use gridbots::components::transform::Direction;
use gridbots::events::turn::SimEvent;
use gridbots::resources::runstate::RunState;
use gridbots::resources::script_runtime::ScriptRunState;
use gridbots::resources::simconfig::SimConfig;
use gridbots::{Scenario, SimError, Simulation};

fn start(json: &str) -> Simulation {
    let scenario = Scenario::from_json(json).unwrap();
    let mut sim = Simulation::new(&scenario, &SimConfig::new()).unwrap();
    sim.start().unwrap();
    sim
}

fn id_of(sim: &Simulation, name: &str) -> EntityId {
    sim.world().find_by_name(name).unwrap().id
}

fn pos_of(sim: &Simulation, name: &str) -> (i32, i32) {
    let p = sim.world().find_by_name(name).unwrap().pose().pos;
    (p.x, p.y)
}

#[test]
fn pushing_a_crate_onto_its_goal_wins() {
    let mut sim = start(
        r#"{
            "terrain": { "default": "solid" },
            "prototypes": { "crate": {} },
            "robots": [{ "name": "bot", "x": 0, "y": 0, "facing": "east", "parts": ["BasicLeg"], "script": "walk()" }],
            "objects": [{ "type": "crate", "x": 1, "y": 0, "name": "box" }],
            "goals": [{ "x": 2, "y": 0, "type": "crate" }]
        }"#,
    );
    let report = sim.advance_turn().unwrap();
    assert!(report.contains(&SimEvent::Victory));
    assert!(report.contains(&SimEvent::GoalFulfilled { goal: 0 }));
    assert!(sim.is_victory());
    assert!(sim.world().find_by_name("box").is_none());
    assert!(matches!(sim.advance_turn(), Err(SimError::NotRunning { .. })));
}

#[test]
fn legs_sink_in_liquid_but_boats_float() {
    let terrain = r#""terrain": { "default": "solid", "tiles": [
        { "x": 1, "y": 0, "terrain": "liquid" }, { "x": 2, "y": 0, "terrain": "liquid" } ] }"#;

    let mut walker = start(&format!(
        r#"{{ {terrain}, "robots": [{{ "name": "walker", "x": 0, "y": 0, "facing": "east",
              "parts": ["BasicLeg"], "script": "walk()" }}] }}"#
    ));
    let err = walker.advance_turn().unwrap_err();
    assert!(matches!(err, SimError::TerrainViolation { ref entity, .. } if entity == "walker"));
    assert!(matches!(walker.state(), RunState::Stopped(_)));

    let mut boat = start(&format!(
        r#"{{ {terrain}, "robots": [{{ "name": "boat", "x": 1, "y": 0, "facing": "east",
              "parts": ["Boat"], "script": "walk() walk()" }}] }}"#
    ));
    boat.advance_turn().unwrap();
    assert_eq!(pos_of(&boat, "boat"), (2, 0));
    assert!(matches!(boat.advance_turn(), Err(SimError::TerrainViolation { .. })));
}

#[test]
fn grabbed_crate_swings_with_the_robot_and_sweeps_obstacles() {
    let mut sim = start(
        r#"{
            "terrain": { "default": "solid" },
            "prototypes": { "crate": {}, "barrel": {} },
            "robots": [{ "name": "bot", "x": 0, "y": 0, "facing": "north",
                         "parts": ["BasicArm", "BasicLeg"], "script": "grab() turnRight() walk()" }],
            "objects": [
                { "type": "crate", "x": 0, "y": 1, "name": "box" },
                { "type": "barrel", "x": 1, "y": 0, "name": "keg" }
            ]
        }"#,
    );
    for _ in 0..3 {
        sim.advance_turn().unwrap();
    }
    let bot = sim.world().find_by_name("bot").unwrap();
    assert_eq!(bot.pose().facing, Direction::East);
    assert_eq!(pos_of(&sim, "bot"), (1, 0));
    assert_eq!(pos_of(&sim, "box"), (2, 0));
    assert_eq!(pos_of(&sim, "keg"), (1, -1));
    assert_eq!(sim.world().carries.carrier_of(id_of(&sim, "box")), Some(bot.id));
}

#[test]
fn welded_neighbours_join_and_move_together() {
    let mut sim = start(
        r#"{
            "terrain": { "default": "solid" },
            "prototypes": { "crate": {} },
            "robots": [
                { "name": "pusher", "x": 0, "y": 0, "facing": "east",
                  "parts": ["WeldingTool", "BasicLeg"], "script": "weld() walk()" },
                { "name": "helper", "x": 0, "y": 1, "facing": "east",
                  "parts": ["WeldingTool"], "script": "weld()" }
            ],
            "objects": [
                { "type": "crate", "x": 1, "y": 0, "name": "low" },
                { "type": "crate", "x": 1, "y": 1, "name": "high" }
            ]
        }"#,
    );
    let (low, high) = (id_of(&sim, "low"), id_of(&sim, "high"));

    let report = sim.advance_turn().unwrap();
    assert!(report.contains(&SimEvent::Connected { a: low, b: high }));
    let group = sim.world().get(low).unwrap().group_id();
    assert!(group.is_some());
    assert_eq!(sim.world().get(high).unwrap().group_id(), group);

    sim.advance_turn().unwrap();
    assert_eq!(pos_of(&sim, "low"), (2, 0));
    assert_eq!(pos_of(&sim, "high"), (2, 1));
}

#[test]
fn action_results_come_back_to_the_script() {
    let mut sim = start(
        r#"{
            "terrain": { "default": "solid" },
            "robots": [{ "name": "bot", "x": 0, "y": 0, "facing": "east", "parts": ["BasicLeg"],
                         "script": "if not walk() then turnLeft() end" }],
            "objects": [{ "type": "wall", "x": 1, "y": 0 }]
        }"#,
    );
    let bot = id_of(&sim, "bot");
    let first = sim.advance_turn().unwrap();
    assert!(first.contains(&SimEvent::ActionPerformed {
        actor: bot,
        action: "walk",
        success: false
    }));
    sim.advance_turn().unwrap();
    assert_eq!(sim.world().get(bot).unwrap().pose().facing, Direction::North);
    assert_eq!(pos_of(&sim, "bot"), (0, 0));
}

#[test]
fn busy_scripts_are_forced_to_yield() {
    let mut sim = start(
        r#"{
            "terrain": { "default": "solid" },
            "robots": [
                { "name": "spinner", "x": 0, "y": 5, "parts": ["BasicLeg"], "script": "while true do end" },
                { "name": "walker", "x": 0, "y": 0, "facing": "east", "parts": ["BasicLeg"], "script": "walk() walk()" }
            ]
        }"#,
    );
    let spinner = id_of(&sim, "spinner");
    for _ in 0..2 {
        let report = sim.advance_turn().unwrap();
        assert!(report.contains(&SimEvent::AutoYielded { actor: spinner }));
    }
    assert_eq!(pos_of(&sim, "walker"), (2, 0));
    assert_eq!(sim.script_state(spinner), Some(ScriptRunState::Suspended));
}

#[test]
fn a_faulting_actor_stops_and_drops_its_load() {
    let mut sim = start(
        r#"{
            "terrain": { "default": "solid" },
            "prototypes": { "crate": {} },
            "robots": [{ "name": "bot", "x": 0, "y": 0, "facing": "north", "parts": ["BasicArm"],
                         "script": "grab() error('boom')" }],
            "objects": [{ "type": "crate", "x": 0, "y": 1 }]
        }"#,
    );
    let bot = id_of(&sim, "bot");
    sim.advance_turn().unwrap();
    assert_eq!(sim.world().carries.len(), 1);

    let report = sim.advance_turn().unwrap();
    assert!(
        report
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::ActorFaulted { actor, reason } if *actor == bot && reason.contains("boom")))
    );
    assert!(sim.world().carries.is_empty());
    assert_eq!(sim.script_state(bot), Some(ScriptRunState::Faulted));
    assert!(sim.state().is_running());
}

#[test]
fn scripts_using_missing_parts_never_start() {
    let scenario = Scenario::from_json(
        r#"{
            "terrain": { "default": "solid" },
            "robots": [{ "name": "bot", "x": 0, "y": 0, "parts": ["BasicLeg"], "script": "walk() weld()" }]
        }"#,
    )
    .unwrap();
    let mut sim = Simulation::new(&scenario, &SimConfig::new()).unwrap();
    let err = sim.start().unwrap_err();
    assert!(matches!(err, SimError::Validation { ref token, .. } if token == "weld"));
    assert!(matches!(sim.state(), RunState::Stopped(_)));
}

#[test]
fn spawned_actors_run_and_reset_discards_them() {
    let mut sim = start(
        r#"{
            "terrain": { "default": "solid" },
            "prototypes": { "drone": { "script": "while true do walk() end" } },
            "spawners": [{ "x": 0, "y": 0, "types": ["drone"], "interval": 1, "facing": "east" }]
        }"#,
    );
    let first = sim.advance_turn().unwrap();
    assert!(first.contains(&SimEvent::Spawned {
        spawner: 0,
        object: EntityId(1)
    }));
    sim.advance_turn().unwrap();
    sim.advance_turn().unwrap();
    assert_eq!(sim.world().pose(EntityId(1)).unwrap().pos.x, 2);
    assert_eq!(sim.world().pose(EntityId(2)).unwrap().pos.x, 1);
    assert_eq!(sim.world().len(), 3);

    sim.reset().unwrap();
    assert!(sim.world().is_empty());
    assert_eq!(sim.turn(), 0);

    sim.start().unwrap();
    let again = sim.advance_turn().unwrap();
    assert!(again.contains(&SimEvent::Spawned {
        spawner: 0,
        object: EntityId(1)
    }));
}
