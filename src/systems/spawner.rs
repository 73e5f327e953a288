//! Spawn phase: spawners drop new objects onto their cells.

use crate::components::entity::EntityId;
use crate::components::spawner::Spawner;
use crate::components::transform::Pose;
use crate::events::turn::SimEvent;
use crate::resources::simworld::SimWorld;
use crate::scenario::Prototypes;
use log::{debug, warn};

/// Ticks every spawner once. Returns the ids of the objects created.
pub fn tick_spawners(
    world: &mut SimWorld,
    spawners: &mut [Spawner],
    prototypes: &Prototypes,
    events: &mut Vec<SimEvent>,
) -> Vec<EntityId> {
    let mut spawned = Vec::new();
    for (index, spawner) in spawners.iter_mut().enumerate() {
        if !spawner.tick() {
            continue;
        }
        let Some(object_type) = spawner.next_type().map(str::to_string) else {
            continue;
        };
        if world.occupant_at(spawner.pos).is_some() {
            debug!("spawner {} at {} is blocked", index, spawner.pos);
            events.push(SimEvent::SpawnBlocked { spawner: index });
            continue;
        }
        let Some(prototype) = prototypes.get(&object_type) else {
            warn!("spawner {} has no prototype named '{}'", index, object_type);
            spawner.advance_queue();
            continue;
        };
        let entity = prototype
            .instantiate(&object_type, Pose::new(spawner.pos, spawner.facing))
            .with_persistent(false);
        if let Some(id) = world.spawn(entity) {
            if let Some(entity) = world.get_mut(id) {
                entity.name = format!("{}{}", object_type, id.0);
            }
            spawner.advance_queue();
            events.push(SimEvent::Spawned { spawner: index, object: id });
            spawned.push(id);
        }
    }
    spawned
}
