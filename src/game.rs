//! The turn orchestrator.
//!
//! A [`Simulation`] owns the world built from a scenario, the script
//! scheduler and the run state. Each call to [`Simulation::advance_turn`]
//! runs one full turn:
//!
//! 1. snapshot every transform as "previous",
//! 2. dispatch one action per live actor, in creation order,
//! 3. run the connection sweep,
//! 4. check terrain (a violation stops the run),
//! 5. evaluate goals (all fulfilled is victory),
//! 6. tick spawners.
//!
//! Turn cadence is up to the caller: call `advance_turn` directly, or feed
//! frame deltas to [`Simulation::update`], which paces turns with a
//! [`TurnClock`].

use crate::components::entity::{Entity, EntityId, EntityKind};
use crate::components::goal::Goal;
use crate::components::part::WORLD_OBJECT_ACTIONS;
use crate::components::spawner::Spawner;
use crate::components::transform::Pose;
use crate::error::SimError;
use crate::events::turn::{SimEvent, TurnReport};
use crate::resources::runstate::RunState;
use crate::resources::script_runtime::{ScriptRunState, ScriptScheduler};
use crate::resources::simconfig::SimConfig;
use crate::resources::simworld::SimWorld;
use crate::resources::terrain::TerrainProvider;
use crate::resources::turnclock::TurnClock;
use crate::scenario::{Blueprint, Scenario};
use crate::systems::terrain::check_terrain;
use crate::systems::{connect, dispatch, goal, spawner};
use log::{debug, error, info};

/// One entity's movement over the current turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: EntityId,
    pub name: String,
    pub kind: &'static str,
    pub previous: Pose,
    pub current: Pose,
    /// Interpolated cell-centre position at the clock's progress.
    pub position: (f32, f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    pub progress: f32,
    pub frames: Vec<Frame>,
}

fn granted_actions(entity: &Entity) -> Vec<&'static str> {
    match &entity.kind {
        EntityKind::Robot(data) => data.parts.granted_actions().into_iter().collect(),
        EntityKind::WorldObject(_) => WORLD_OBJECT_ACTIONS.to_vec(),
        EntityKind::Group(_) => Vec::new(),
    }
}

pub struct Simulation {
    blueprint: Blueprint,
    world: SimWorld,
    goals: Vec<Goal>,
    spawners: Vec<Spawner>,
    terrain: Box<dyn TerrainProvider>,
    scheduler: ScriptScheduler,
    state: RunState,
    turn: u64,
    clock: TurnClock,
    config: SimConfig,
}

impl Simulation {
    pub fn new(scenario: &Scenario, config: &SimConfig) -> Result<Self, SimError> {
        Self::from_blueprint(scenario.build()?, config)
    }

    pub fn from_blueprint(blueprint: Blueprint, config: &SimConfig) -> Result<Self, SimError> {
        let scheduler = ScriptScheduler::new(config.auto_yield_instructions)?;
        Ok(Self {
            world: blueprint.world.clone(),
            goals: blueprint.goals.clone(),
            spawners: blueprint.spawners.clone(),
            terrain: Box::new(blueprint.terrain.clone()),
            blueprint,
            scheduler,
            state: RunState::Idle,
            turn: 0,
            clock: TurnClock::new(config.seconds_per_turn).with_time_scale(config.speed),
            config: config.clone(),
        })
    }

    /// Replaces the terrain the simulation checks against.
    pub fn with_terrain(mut self, terrain: Box<dyn TerrainProvider>) -> Self {
        self.terrain = terrain;
        self
    }

    /// Validates and compiles every script, then starts running. Resumes a
    /// paused run. A script that fails to compile or uses an action its
    /// owner lacks stops the run before the first turn.
    pub fn start(&mut self) -> Result<(), SimError> {
        match &self.state {
            RunState::Running => return Ok(()),
            RunState::Paused => {
                self.state = RunState::Running;
                return Ok(());
            }
            RunState::Victory | RunState::Stopped(_) => {
                return Err(SimError::NotRunning {
                    action: "start",
                    state: self.state.to_string(),
                });
            }
            RunState::Idle => {}
        }
        if let Err(err) = self.prepare_scripts() {
            error!("cannot start: {}", err);
            self.state = RunState::Stopped(err.to_string());
            return Err(err);
        }
        info!("simulation started with {} actors", self.scheduler.len());
        self.state = RunState::Running;
        Ok(())
    }

    fn prepare_scripts(&mut self) -> Result<(), SimError> {
        for (name, prototype) in &self.blueprint.prototypes {
            if let Some(source) = &prototype.script {
                self.scheduler.check(name, source, &WORLD_OBJECT_ACTIONS)?;
            }
        }
        let pending: Vec<(EntityId, String, String, Vec<&'static str>)> = self
            .world
            .iter()
            .filter(|e| !self.scheduler.is_installed(e.id))
            .filter_map(|e| {
                e.script
                    .as_ref()
                    .map(|source| (e.id, e.name.clone(), source.clone(), granted_actions(e)))
            })
            .collect();
        for (id, name, source, actions) in pending {
            self.scheduler.install(id, &name, &source, &actions)?;
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SimError> {
        if !self.state.is_running() {
            return Err(SimError::NotRunning {
                action: "pause",
                state: self.state.to_string(),
            });
        }
        self.state = RunState::Paused;
        info!("simulation paused at turn {}", self.turn);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SimError> {
        if self.state != RunState::Paused {
            return Err(SimError::NotRunning {
                action: "resume",
                state: self.state.to_string(),
            });
        }
        self.state = RunState::Running;
        Ok(())
    }

    /// Back to the scenario's initial world. Spawned objects and their scripts
    /// are discarded; every remaining script restarts from the top.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.world = self.blueprint.world.clone();
        let world = &self.world;
        self.scheduler
            .retain(|id| world.get(id).is_some_and(|e| e.persistent));
        self.scheduler.restart_all()?;
        for goal in &mut self.goals {
            goal.reset();
        }
        for spawner in &mut self.spawners {
            spawner.reset();
        }
        self.clock.reset();
        self.turn = 0;
        self.state = RunState::Idle;
        info!("simulation reset");
        Ok(())
    }

    pub fn advance_turn(&mut self) -> Result<TurnReport, SimError> {
        if !self.state.is_running() {
            return Err(SimError::NotRunning {
                action: "advance_turn",
                state: self.state.to_string(),
            });
        }
        self.turn += 1;
        let mut report = TurnReport::new(self.turn);
        debug!("turn {} begins", self.turn);

        self.world.snapshot_previous();
        dispatch::dispatch_actions(
            &mut self.world,
            self.terrain.as_ref(),
            &mut self.scheduler,
            &mut report.events,
        );

        for (a, b) in connect::connection_sweep(&mut self.world) {
            report.events.push(SimEvent::Connected { a, b });
        }

        if let Err(err) = check_terrain(&self.world, self.terrain.as_ref()) {
            error!("turn {}: {}", self.turn, err);
            self.state = RunState::Stopped(err.to_string());
            return Err(err);
        }

        report
            .events
            .extend(goal::evaluate_goals(&mut self.world, &mut self.goals));
        let world = &self.world;
        self.scheduler.retain(|id| world.contains(id));

        if goal::all_fulfilled(&self.goals) {
            info!("all goals fulfilled on turn {}", self.turn);
            report.events.push(SimEvent::Victory);
            self.state = RunState::Victory;
            return Ok(report);
        }

        let spawned = spawner::tick_spawners(
            &mut self.world,
            &mut self.spawners,
            &self.blueprint.prototypes,
            &mut report.events,
        );
        for id in spawned {
            if let Err(err) = self.install_spawned(id) {
                error!("turn {}: {}", self.turn, err);
                self.state = RunState::Stopped(err.to_string());
                return Err(err);
            }
        }
        Ok(report)
    }

    fn install_spawned(&mut self, id: EntityId) -> Result<(), SimError> {
        let Some(entity) = self.world.get(id) else {
            return Ok(());
        };
        let Some(source) = entity.script.clone() else {
            return Ok(());
        };
        let name = entity.name.clone();
        let actions = granted_actions(entity);
        self.scheduler.install(id, &name, &source, &actions)
    }

    /// Advances the turn clock by `delta` seconds and runs the turns that
    /// became due. Does nothing unless running.
    pub fn update(&mut self, delta: f32) -> Result<Vec<TurnReport>, SimError> {
        let mut reports = Vec::new();
        if !self.state.is_running() {
            return Ok(reports);
        }
        let due = self.clock.advance(delta);
        for _ in 0..due {
            if !self.state.is_running() {
                break;
            }
            reports.push(self.advance_turn()?);
        }
        Ok(reports)
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.clock.time_scale = speed.max(0.0);
    }

    /// Previous and current pose of every grid entity, for drawing the
    /// current turn in motion.
    pub fn presentation(&self) -> Presentation {
        let progress = self.clock.progress();
        let frames = self
            .world
            .iter()
            .filter(|e| e.is_grid_resident())
            .map(|e| Frame {
                id: e.id,
                name: e.name.clone(),
                kind: e.kind_name(),
                previous: e.transform.previous,
                current: e.transform.current,
                position: e.transform.lerp_position(progress),
            })
            .collect();
        Presentation { progress, frames }
    }

    pub fn is_victory(&self) -> bool {
        self.state == RunState::Victory
    }

    /// True while some actor can still act.
    pub fn has_live_actors(&self) -> bool {
        self.scheduler.any_live()
    }

    /// Whether another turn can still change anything: an actor has actions
    /// left or a spawner has something to spawn.
    pub fn can_progress(&self) -> bool {
        self.has_live_actors() || self.spawners.iter().any(|s| !s.types.is_empty())
    }

    pub fn script_state(&self, actor: EntityId) -> Option<ScriptRunState> {
        self.scheduler.run_state(actor)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulation(json: &str) -> Simulation {
        let scenario = Scenario::from_json(json).unwrap();
        Simulation::new(&scenario, &SimConfig::new()).unwrap()
    }

    const WALKER: &str = r#"{
        "terrain": { "default": "solid" },
        "robots": [{ "name": "bot", "x": 0, "y": 0, "facing": "east",
                     "parts": ["BasicLeg"], "script": "for i = 1, 3 do walk() end" }]
    }"#;

    #[test]
    fn turns_require_running() {
        let mut sim = simulation(WALKER);
        assert!(matches!(sim.advance_turn(), Err(SimError::NotRunning { .. })));
        sim.start().unwrap();
        assert!(sim.advance_turn().is_ok());
        sim.pause().unwrap();
        assert!(sim.advance_turn().is_err());
        assert_eq!(sim.turn(), 1);
        sim.resume().unwrap();
        assert!(sim.advance_turn().is_ok());
    }

    #[test]
    fn presentation_reports_previous_and_current() {
        let mut sim = simulation(WALKER);
        sim.start().unwrap();
        sim.advance_turn().unwrap();
        let view = sim.presentation();
        let bot = view.frames.iter().find(|f| f.name == "bot").unwrap();
        assert_eq!(bot.previous.pos.x, 0);
        assert_eq!(bot.current.pos.x, 1);
        assert_eq!(bot.position, (0.5, 0.5));
    }

    #[test]
    fn script_finishes_after_its_actions() {
        let mut sim = simulation(WALKER);
        sim.start().unwrap();
        for _ in 0..3 {
            sim.advance_turn().unwrap();
        }
        assert!(sim.has_live_actors());
        let report = sim.advance_turn().unwrap();
        assert!(matches!(report.events.as_slice(), [SimEvent::ScriptFinished { .. }]));
        assert!(!sim.has_live_actors());
        assert!(!sim.can_progress());
        assert_eq!(sim.world().find_by_name("bot").unwrap().pose().pos.x, 3);
    }

    #[test]
    fn spawners_keep_a_run_going_without_actors() {
        let mut sim = simulation(
            r#"{
                "terrain": { "default": "solid" },
                "prototypes": { "crate": {} },
                "spawners": [{ "x": 0, "y": 0, "types": ["crate"], "interval": 2 }]
            }"#,
        );
        sim.start().unwrap();
        assert!(!sim.has_live_actors());
        assert!(sim.can_progress());
        sim.advance_turn().unwrap();
        assert_eq!(sim.world().len(), 1);
        assert!(sim.can_progress());
    }

    #[test]
    fn update_paces_turns_by_the_clock() {
        let mut sim = simulation(WALKER);
        sim.start().unwrap();
        assert!(sim.update(0.25).unwrap().is_empty());
        assert_eq!(sim.update(0.25).unwrap().len(), 1);
        sim.set_speed(2.0);
        assert_eq!(sim.update(0.5).unwrap().len(), 2);
        assert_eq!(sim.turn(), 3);
    }

    #[test]
    fn reset_restores_the_initial_world() {
        let mut sim = simulation(WALKER);
        sim.start().unwrap();
        sim.advance_turn().unwrap();
        sim.advance_turn().unwrap();
        sim.reset().unwrap();
        assert_eq!(sim.state(), &RunState::Idle);
        assert_eq!(sim.turn(), 0);
        assert_eq!(sim.world().find_by_name("bot").unwrap().pose().pos.x, 0);

        sim.start().unwrap();
        for _ in 0..3 {
            sim.advance_turn().unwrap();
        }
        assert_eq!(sim.world().find_by_name("bot").unwrap().pose().pos.x, 3);
    }

    #[test]
    fn forbidden_action_stops_before_the_first_turn() {
        let mut sim = simulation(
            r#"{
                "terrain": { "default": "solid" },
                "robots": [{ "name": "bot", "x": 0, "y": 0, "parts": ["BasicLeg"], "script": "grab()" }]
            }"#,
        );
        assert!(matches!(sim.start(), Err(SimError::Validation { .. })));
        assert!(matches!(sim.state(), RunState::Stopped(_)));
        assert!(sim.advance_turn().is_err());
    }
}
