//! Entities of the simulation world.
//!
//! An [`Entity`] is a tagged [`EntityKind`] plus the attributes every kind
//! shares. Robots and world objects are grid-resident: they occupy exactly one
//! cell each. A group entity is not; its transform is only the anchor its
//! members are attached to.

use crate::components::part::PartSet;
use crate::components::transform::{Pose, Transform};
use crate::components::worldobject::WorldObjectData;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Stable entity id. Ids are handed out in creation order and never reused
/// within a run, so sorting by id gives creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotData {
    pub parts: PartSet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupData {
    pub members: SmallVec<[EntityId; 8]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Robot(RobotData),
    WorldObject(WorldObjectData),
    Group(GroupData),
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub transform: Transform,
    pub movable: bool,
    pub grabbable: bool,
    /// Persistent entities come from the scenario and survive reset.
    pub persistent: bool,
    /// Lua source driving this entity, if it is an actor.
    pub script: Option<String>,
}

impl Entity {
    fn with_kind(name: impl Into<String>, kind: EntityKind, pose: Pose) -> Self {
        Self {
            id: EntityId(0),
            name: name.into(),
            kind,
            transform: Transform::new(pose),
            movable: true,
            grabbable: false,
            persistent: true,
            script: None,
        }
    }

    pub fn robot(name: impl Into<String>, pose: Pose, parts: PartSet) -> Self {
        Self::with_kind(name, EntityKind::Robot(RobotData { parts }), pose)
    }

    pub fn world_object(name: impl Into<String>, pose: Pose, data: WorldObjectData) -> Self {
        let mut entity = Self::with_kind(name, EntityKind::WorldObject(data), pose);
        entity.grabbable = true;
        entity
    }

    pub fn group(name: impl Into<String>, anchor: Pose) -> Self {
        Self::with_kind(name, EntityKind::Group(GroupData::default()), anchor)
    }

    pub fn with_script(mut self, source: impl Into<String>) -> Self {
        self.script = Some(source.into());
        self
    }

    pub fn with_movable(mut self, movable: bool) -> Self {
        self.movable = movable;
        self
    }

    pub fn with_grabbable(mut self, grabbable: bool) -> Self {
        self.grabbable = grabbable;
        self
    }

    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn pose(&self) -> Pose {
        self.transform.current
    }

    pub fn is_grid_resident(&self) -> bool {
        !matches!(self.kind, EntityKind::Group(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EntityKind::Robot(_) => "robot",
            EntityKind::WorldObject(_) => "object",
            EntityKind::Group(_) => "group",
        }
    }

    /// Object type for world objects, `"robot"` for robots.
    pub fn type_name(&self) -> &str {
        match &self.kind {
            EntityKind::Robot(_) => "robot",
            EntityKind::WorldObject(data) => &data.object_type,
            EntityKind::Group(_) => "group",
        }
    }

    pub fn as_robot(&self) -> Option<&RobotData> {
        match &self.kind {
            EntityKind::Robot(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_world_object(&self) -> Option<&WorldObjectData> {
        match &self.kind {
            EntityKind::WorldObject(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_world_object_mut(&mut self) -> Option<&mut WorldObjectData> {
        match &mut self.kind {
            EntityKind::WorldObject(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupData> {
        match &self.kind {
            EntityKind::Group(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupData> {
        match &mut self.kind {
            EntityKind::Group(data) => Some(data),
            _ => None,
        }
    }

    /// Group this entity belongs to, if any.
    pub fn group_id(&self) -> Option<EntityId> {
        self.as_world_object().and_then(|data| data.group())
    }
}
