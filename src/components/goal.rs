//! Delivery goals.
//!
//! A goal waits on one cell for objects of a given type. Optional
//! requirements narrow the match to a facing and to an absolute N/E/S/W
//! connection pattern. Goals that share a `group` tag form a goal group and
//! are consumed together.

use crate::components::entity::{Entity, EntityId};
use crate::components::transform::{Direction, GridPos};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    pub pos: GridPos,
    pub object_type: String,
    pub target: u32,
    pub current: u32,
    pub fulfilled: bool,
    /// Required facing, when rotation matters.
    pub required_facing: Option<Direction>,
    /// Required absolute connections in N, E, S, W order.
    pub required_connections: Option<[bool; 4]>,
    pub group: Option<String>,
    /// Matching object found this turn, if any.
    pub candidate: Option<EntityId>,
}

impl Goal {
    pub fn new(pos: GridPos, object_type: impl Into<String>, target: u32) -> Self {
        Self {
            pos,
            object_type: object_type.into(),
            target: target.max(1),
            current: 0,
            fulfilled: false,
            required_facing: None,
            required_connections: None,
            group: None,
            candidate: None,
        }
    }

    pub fn with_facing(mut self, facing: Direction) -> Self {
        self.required_facing = Some(facing);
        self
    }

    pub fn with_connections(mut self, connections: [bool; 4]) -> Self {
        self.required_connections = Some(connections);
        self
    }

    pub fn in_group(mut self, tag: impl Into<String>) -> Self {
        self.group = Some(tag.into());
        self
    }

    pub fn has_fitting_object(&self) -> bool {
        self.candidate.is_some()
    }

    /// Type, then facing, then connection pattern.
    pub fn matches(&self, entity: &Entity) -> bool {
        let Some(data) = entity.as_world_object() else {
            return false;
        };
        if data.object_type != self.object_type {
            return false;
        }
        if let Some(facing) = self.required_facing {
            if entity.pose().facing != facing {
                return false;
            }
        }
        if let Some(pattern) = self.required_connections {
            if data.absolute_connections(entity.pose().facing) != pattern {
                return false;
            }
        }
        true
    }

    /// Counts one consumed object. Returns true when this delivery fulfils
    /// the goal.
    pub fn record_delivery(&mut self) -> bool {
        if self.fulfilled {
            return false;
        }
        self.current += 1;
        if self.current >= self.target {
            self.fulfilled = true;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.current = 0;
        self.fulfilled = false;
        self.candidate = None;
    }
}
