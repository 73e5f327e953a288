//! World object data: type, colour, terrain compatibility and connections.
//!
//! Connection slots are relative to the object's own facing, so a welded
//! pair keeps the same slots however the pair is later turned. The absolute
//! N/E/S/W pattern that goals compare against is derived from the slots and
//! the current facing.

use crate::components::entity::EntityId;
use crate::components::transform::{Attachment, Direction};
use crate::resources::terrain::TerrainType;
use arrayvec::ArrayVec;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionSlot {
    Front,
    Right,
    Back,
    Left,
}

impl ConnectionSlot {
    pub const ALL: [ConnectionSlot; 4] = [
        ConnectionSlot::Front,
        ConnectionSlot::Right,
        ConnectionSlot::Back,
        ConnectionSlot::Left,
    ];

    pub fn index(self) -> usize {
        match self {
            ConnectionSlot::Front => 0,
            ConnectionSlot::Right => 1,
            ConnectionSlot::Back => 2,
            ConnectionSlot::Left => 3,
        }
    }

    /// Slot facing a neighbour at `delta`, for an object facing `facing`.
    pub fn toward(facing: Direction, delta: (i32, i32)) -> Option<Self> {
        let dir = Direction::from_vector(delta.0, delta.1)?;
        Some(Self::ALL[facing.quarter_turns_to(dir) as usize])
    }

    pub fn absolute(self, facing: Direction) -> Direction {
        facing.rotated(self.index() as u8)
    }
}

/// Membership of a connectivity group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub group: EntityId,
    pub attachment: Attachment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldObjectData {
    pub object_type: String,
    pub color: Option<String>,
    pub terrain: SmallVec<[TerrainType; 2]>,
    pub connections: [Option<EntityId>; 4],
    pub open_for_connection: bool,
    pub membership: Option<Membership>,
}

impl WorldObjectData {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            color: None,
            terrain: SmallVec::from_slice(&[TerrainType::Solid]),
            connections: [None; 4],
            open_for_connection: false,
            membership: None,
        }
    }

    pub fn with_terrain(mut self, terrain: &[TerrainType]) -> Self {
        self.terrain = SmallVec::from_slice(terrain);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn group(&self) -> Option<EntityId> {
        self.membership.map(|m| m.group)
    }

    pub fn slot_free(&self, slot: ConnectionSlot) -> bool {
        self.connections[slot.index()].is_none()
    }

    pub fn is_connected_to(&self, other: EntityId) -> bool {
        self.connections.contains(&Some(other))
    }

    pub fn connect(&mut self, slot: ConnectionSlot, other: EntityId) {
        self.connections[slot.index()] = Some(other);
    }

    /// Clears every slot holding `other`. Returns whether one did.
    pub fn disconnect(&mut self, other: EntityId) -> bool {
        let mut found = false;
        for slot in self.connections.iter_mut() {
            if *slot == Some(other) {
                *slot = None;
                found = true;
            }
        }
        found
    }

    pub fn neighbours(&self) -> ArrayVec<EntityId, 4> {
        self.connections.iter().flatten().copied().collect()
    }

    /// Absolute connection flags in N, E, S, W order.
    pub fn absolute_connections(&self, facing: Direction) -> [bool; 4] {
        let mut flags = [false; 4];
        for slot in ConnectionSlot::ALL {
            if !self.slot_free(slot) {
                flags[slot.absolute(facing).index() as usize] = true;
            }
        }
        flags
    }

    pub fn supports_terrain(&self, terrain: TerrainType) -> bool {
        self.terrain.contains(&terrain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_toward_is_relative_to_facing() {
        assert_eq!(
            ConnectionSlot::toward(Direction::North, (0, 1)),
            Some(ConnectionSlot::Front)
        );
        assert_eq!(
            ConnectionSlot::toward(Direction::East, (0, 1)),
            Some(ConnectionSlot::Left)
        );
        assert_eq!(
            ConnectionSlot::toward(Direction::South, (0, 1)),
            Some(ConnectionSlot::Back)
        );
        assert_eq!(ConnectionSlot::toward(Direction::South, (1, 1)), None);
    }

    #[test]
    fn absolute_connections_rotate_with_facing() {
        let mut data = WorldObjectData::new("crate");
        data.connect(ConnectionSlot::Front, EntityId(7));

        assert_eq!(data.absolute_connections(Direction::North), [true, false, false, false]);
        assert_eq!(data.absolute_connections(Direction::West), [false, false, false, true]);
    }

    #[test]
    fn disconnect_clears_slot() {
        let mut data = WorldObjectData::new("crate");
        data.connect(ConnectionSlot::Left, EntityId(3));
        assert!(data.is_connected_to(EntityId(3)));
        assert!(data.disconnect(EntityId(3)));
        assert!(!data.disconnect(EntityId(3)));
        assert!(data.neighbours().is_empty());
    }
}
