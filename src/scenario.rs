//! Scenario files.
//!
//! A scenario is a JSON document describing the terrain, the object
//! prototypes, and the robots, objects, goals and spawners placed on the
//! grid. [`Scenario::build`] turns it into a [`Blueprint`]: the initial world
//! a simulation starts from and returns to on reset.
//!
//! # Example
//!
//! ```json
//! {
//!   "terrain": { "default": "solid", "tiles": [{ "x": 3, "y": 0, "terrain": "liquid" }] },
//!   "prototypes": { "crate": { "terrain": ["solid"] } },
//!   "robots": [{ "name": "bot", "x": 0, "y": 0, "facing": "east",
//!                "parts": ["BasicLeg", "BasicArm"], "script": "walk()" }],
//!   "objects": [{ "type": "crate", "x": 1, "y": 0 }],
//!   "goals": [{ "x": 2, "y": 0, "type": "crate", "count": 1 }],
//!   "spawners": []
//! }
//! ```

use crate::components::entity::Entity;
use crate::components::goal::Goal;
use crate::components::part::{Part, PartSet};
use crate::components::spawner::Spawner;
use crate::components::transform::{Direction, GridPos, Pose};
use crate::components::worldobject::WorldObjectData;
use crate::error::SimError;
use crate::resources::simworld::SimWorld;
use crate::resources::terrain::{GridTerrain, TerrainType, Tile};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub type Prototypes = BTreeMap<String, ObjectPrototype>;

/// Template for world objects of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectPrototype {
    pub movable: bool,
    pub grabbable: bool,
    pub terrain: Vec<TerrainType>,
    pub color: Option<String>,
    pub script: Option<String>,
}

impl Default for ObjectPrototype {
    fn default() -> Self {
        Self {
            movable: true,
            grabbable: true,
            terrain: vec![TerrainType::Solid],
            color: None,
            script: None,
        }
    }
}

impl ObjectPrototype {
    /// Immovable, ungrabbable obstacle.
    pub fn wall() -> Self {
        Self {
            movable: false,
            grabbable: false,
            ..Self::default()
        }
    }

    pub fn instantiate(&self, object_type: &str, pose: Pose) -> Entity {
        let mut data = WorldObjectData::new(object_type).with_terrain(&self.terrain);
        data.color = self.color.clone();
        let mut entity = Entity::world_object(object_type, pose, data)
            .with_movable(self.movable)
            .with_grabbable(self.grabbable);
        entity.script = self.script.clone();
        entity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSpec {
    pub x: i32,
    pub y: i32,
    pub terrain: TerrainType,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainSpec {
    #[serde(default)]
    pub default: Option<TerrainType>,
    #[serde(default)]
    pub tiles: Vec<TileSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSpec {
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub facing: Direction,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub script_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    #[serde(rename = "type")]
    pub object_type: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub facing: Direction,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub script_path: Option<PathBuf>,
}

/// Absolute connections a goal requires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionPattern {
    pub north: bool,
    pub east: bool,
    pub south: bool,
    pub west: bool,
}

impl ConnectionPattern {
    pub fn flags(self) -> [bool; 4] {
        [self.north, self.east, self.south, self.west]
    }
}

fn default_count() -> u32 {
    1
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSpec {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub rotation: Option<Direction>,
    #[serde(default)]
    pub connections: Option<ConnectionPattern>,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnerSpec {
    pub x: i32,
    pub y: i32,
    pub types: Vec<String>,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default)]
    pub facing: Direction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub terrain: TerrainSpec,
    #[serde(default)]
    pub prototypes: Prototypes,
    #[serde(default)]
    pub robots: Vec<RobotSpec>,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub goals: Vec<GoalSpec>,
    #[serde(default)]
    pub spawners: Vec<SpawnerSpec>,
}

/// Everything a simulation is built from, in its initial state.
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub world: SimWorld,
    pub goals: Vec<Goal>,
    pub spawners: Vec<Spawner>,
    pub terrain: GridTerrain,
    pub prototypes: Prototypes,
}

fn read_script(base: &Path, path: &Path) -> Result<String, SimError> {
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    std::fs::read_to_string(&full)
        .map_err(|e| SimError::Scenario(format!("cannot read script {}: {}", full.display(), e)))
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads a scenario file and inlines any `script_path` it references,
    /// resolved relative to the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let mut scenario = Self::from_json(&std::fs::read_to_string(path)?)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        for robot in &mut scenario.robots {
            if let Some(script_path) = robot.script_path.take() {
                robot.script = Some(read_script(base, &script_path)?);
            }
        }
        for object in &mut scenario.objects {
            if let Some(script_path) = object.script_path.take() {
                object.script = Some(read_script(base, &script_path)?);
            }
        }
        info!(
            "Loaded scenario {}: {} robots, {} objects, {} goals",
            scenario.name.as_deref().unwrap_or("<unnamed>"),
            scenario.robots.len(),
            scenario.objects.len(),
            scenario.goals.len()
        );
        Ok(scenario)
    }

    fn build_terrain(&self) -> GridTerrain {
        let mut terrain = GridTerrain::new();
        if let Some(default) = self.terrain.default {
            terrain = terrain.with_default(Tile::new(default));
        }
        for entry in &self.terrain.tiles {
            terrain.set_tile(
                GridPos::new(entry.x, entry.y),
                Tile {
                    terrain: entry.terrain,
                    tags: entry.tags.clone(),
                },
            );
        }
        terrain
    }

    /// Builds the initial world. Robots get ids first, then objects, both in
    /// file order.
    pub fn build(&self) -> Result<Blueprint, SimError> {
        let mut prototypes = self.prototypes.clone();
        prototypes
            .entry("wall".to_string())
            .or_insert_with(ObjectPrototype::wall);

        let mut world = SimWorld::new();
        for entry in &self.robots {
            if entry.script_path.is_some() && entry.script.is_none() {
                return Err(SimError::Scenario(format!(
                    "robot '{}' references a script file; load the scenario with Scenario::from_path",
                    entry.name
                )));
            }
            let parts: PartSet = entry.parts.iter().copied().collect();
            let mut entity = Entity::robot(&entry.name, Pose::at(entry.x, entry.y, entry.facing), parts);
            entity.script = entry.script.clone();
            world.spawn(entity).ok_or_else(|| {
                SimError::Scenario(format!("robot '{}' overlaps another entity at ({}, {})", entry.name, entry.x, entry.y))
            })?;
        }

        for entry in &self.objects {
            let prototype = prototypes.get(&entry.object_type).ok_or_else(|| {
                SimError::Scenario(format!("object type '{}' has no prototype", entry.object_type))
            })?;
            let mut entity = prototype.instantiate(&entry.object_type, Pose::at(entry.x, entry.y, entry.facing));
            if let Some(name) = &entry.name {
                entity.name = name.clone();
            }
            if let Some(color) = &entry.color {
                if let Some(data) = entity.as_world_object_mut() {
                    data.color = Some(color.clone());
                }
            }
            if entry.script.is_some() {
                entity.script = entry.script.clone();
            }
            let id = world.spawn(entity).ok_or_else(|| {
                SimError::Scenario(format!(
                    "object '{}' overlaps another entity at ({}, {})",
                    entry.object_type, entry.x, entry.y
                ))
            })?;
            if entry.name.is_none() {
                if let Some(entity) = world.get_mut(id) {
                    entity.name = format!("{}{}", entry.object_type, id.0);
                }
            }
        }

        let mut goals = Vec::with_capacity(self.goals.len());
        for entry in &self.goals {
            if !prototypes.contains_key(&entry.object_type) {
                return Err(SimError::Scenario(format!(
                    "goal wants unknown object type '{}'",
                    entry.object_type
                )));
            }
            let mut goal = Goal::new(GridPos::new(entry.x, entry.y), &entry.object_type, entry.count);
            if let Some(facing) = entry.rotation {
                goal = goal.with_facing(facing);
            }
            if let Some(pattern) = entry.connections {
                goal = goal.with_connections(pattern.flags());
            }
            if let Some(tag) = &entry.group {
                goal = goal.in_group(tag);
            }
            goals.push(goal);
        }

        let mut spawners = Vec::with_capacity(self.spawners.len());
        for entry in &self.spawners {
            if let Some(unknown) = entry.types.iter().find(|t| !prototypes.contains_key(*t)) {
                return Err(SimError::Scenario(format!(
                    "spawner at ({}, {}) wants unknown object type '{}'",
                    entry.x, entry.y, unknown
                )));
            }
            spawners.push(
                Spawner::new(GridPos::new(entry.x, entry.y), entry.types.clone(), entry.interval)
                    .with_facing(entry.facing),
            );
        }

        Ok(Blueprint {
            world,
            goals,
            spawners,
            terrain: self.build_terrain(),
            prototypes,
        })
    }
}
