//! The simulation world: every entity, the occupancy index and the carry
//! table.
//!
//! Entities live in a `BTreeMap` keyed by [`EntityId`], so iteration is in
//! creation order. Grid-resident entities are indexed by cell; at most one
//! entity occupies a cell. Poses are only changed through
//! [`SimWorld::apply_poses`], which keeps the index in step.

use crate::components::carry::CarryTable;
use crate::components::entity::{Entity, EntityId};
use crate::components::transform::{GridPos, Pose};
use log::warn;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    entities: BTreeMap<EntityId, Entity>,
    occupancy: FxHashMap<GridPos, EntityId>,
    pub carries: CarryTable,
    next_id: u32,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    /// Adds `entity` under a fresh id and returns it. Returns `None` if the
    /// entity is grid-resident and its cell is taken.
    pub fn spawn(&mut self, mut entity: Entity) -> Option<EntityId> {
        if entity.is_grid_resident() && self.occupancy.contains_key(&entity.pose().pos) {
            return None;
        }
        let id = self.allocate_id();
        entity.id = id;
        self.index(&entity);
        self.entities.insert(id, entity);
        Some(id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if entity.is_grid_resident() && self.occupancy.get(&entity.pose().pos) == Some(&id) {
            self.occupancy.remove(&entity.pose().pos);
        }
        self.carries.forget(id);
        Some(entity)
    }

    fn index(&mut self, entity: &Entity) {
        if entity.is_grid_resident() {
            self.occupancy.insert(entity.pose().pos, entity.id);
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn pose(&self, id: EntityId) -> Option<Pose> {
        self.entities.get(&id).map(Entity::pose)
    }

    pub fn occupant_at(&self, pos: GridPos) -> Option<EntityId> {
        self.occupancy.get(&pos).copied()
    }

    /// Ids in creation order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.values().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The entity that moves as a unit with `id`: its group if it has one.
    pub fn root_of(&self, id: EntityId) -> EntityId {
        self.get(id).and_then(Entity::group_id).unwrap_or(id)
    }

    /// Whether `id` is held, directly or through its group.
    pub fn is_carried(&self, id: EntityId) -> bool {
        self.carries.carrier_of(id).is_some() || self.carries.carrier_of(self.root_of(id)).is_some()
    }

    /// Writes a batch of poses at once. All old cells are vacated before the
    /// new ones are claimed, so members of one rigid body may swap cells.
    pub fn apply_poses(&mut self, updates: &[(EntityId, Pose)]) {
        for (id, _) in updates {
            if let Some(entity) = self.entities.get(id) {
                if entity.is_grid_resident() && self.occupancy.get(&entity.pose().pos) == Some(id) {
                    self.occupancy.remove(&entity.pose().pos);
                }
            }
        }
        for (id, pose) in updates {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            entity.transform.current = *pose;
            if entity.is_grid_resident() {
                if let Some(previous) = self.occupancy.insert(pose.pos, *id) {
                    if previous != *id {
                        warn!("{} overwrote {} in the occupancy index at {}", id, previous, pose.pos);
                    }
                }
            }
        }
    }

    pub fn capture_poses(&self) -> Vec<(EntityId, Pose)> {
        self.entities.iter().map(|(id, e)| (*id, e.pose())).collect()
    }

    /// Puts back poses captured by [`SimWorld::capture_poses`] and rebuilds
    /// the occupancy index.
    pub fn restore_poses(&mut self, snapshot: &[(EntityId, Pose)]) {
        for (id, pose) in snapshot {
            if let Some(entity) = self.entities.get_mut(id) {
                entity.transform.current = *pose;
            }
        }
        self.reindex();
    }

    pub fn reindex(&mut self) {
        self.occupancy.clear();
        for entity in self.entities.values() {
            if entity.is_grid_resident() {
                self.occupancy.insert(entity.pose().pos, entity.id);
            }
        }
    }

    pub fn snapshot_previous(&mut self) {
        for entity in self.entities.values_mut() {
            entity.transform.snapshot_previous();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::part::PartSet;
    use crate::components::transform::Direction;
    use crate::components::worldobject::WorldObjectData;

    #[test]
    fn spawn_indexes_and_refuses_taken_cells() {
        let mut world = SimWorld::new();
        let a = world
            .spawn(Entity::robot("a", Pose::at(0, 0, Direction::North), PartSet::new()))
            .unwrap();
        assert_eq!(world.occupant_at(GridPos::new(0, 0)), Some(a));
        assert!(world
            .spawn(Entity::world_object(
                "b",
                Pose::at(0, 0, Direction::North),
                WorldObjectData::new("crate")
            ))
            .is_none());
    }

    #[test]
    fn ids_are_in_creation_order() {
        let mut world = SimWorld::new();
        let first = world
            .spawn(Entity::robot("a", Pose::at(0, 0, Direction::North), PartSet::new()))
            .unwrap();
        let second = world
            .spawn(Entity::robot("b", Pose::at(1, 0, Direction::North), PartSet::new()))
            .unwrap();
        assert!(first < second);
        assert_eq!(world.ids(), vec![first, second]);
    }

    #[test]
    fn apply_poses_allows_swaps() {
        let mut world = SimWorld::new();
        let a = world
            .spawn(Entity::robot("a", Pose::at(0, 0, Direction::North), PartSet::new()))
            .unwrap();
        let b = world
            .spawn(Entity::robot("b", Pose::at(1, 0, Direction::North), PartSet::new()))
            .unwrap();
        world.apply_poses(&[
            (a, Pose::at(1, 0, Direction::North)),
            (b, Pose::at(0, 0, Direction::North)),
        ]);
        assert_eq!(world.occupant_at(GridPos::new(1, 0)), Some(a));
        assert_eq!(world.occupant_at(GridPos::new(0, 0)), Some(b));
    }

    #[test]
    fn restore_poses_rebuilds_index() {
        let mut world = SimWorld::new();
        let a = world
            .spawn(Entity::robot("a", Pose::at(0, 0, Direction::North), PartSet::new()))
            .unwrap();
        let snapshot = world.capture_poses();
        world.apply_poses(&[(a, Pose::at(3, 3, Direction::East))]);
        world.restore_poses(&snapshot);
        assert_eq!(world.occupant_at(GridPos::new(0, 0)), Some(a));
        assert_eq!(world.occupant_at(GridPos::new(3, 3)), None);
        assert_eq!(world.pose(a), Some(Pose::at(0, 0, Direction::North)));
    }

    #[test]
    fn remove_clears_cell() {
        let mut world = SimWorld::new();
        let a = world
            .spawn(Entity::robot("a", Pose::at(2, 2, Direction::North), PartSet::new()))
            .unwrap();
        assert!(world.remove(a).is_some());
        assert!(world.occupant_at(GridPos::new(2, 2)).is_none());
        assert!(!world.contains(a));
    }
}
