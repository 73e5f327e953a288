//! Terrain compatibility check run after the connection sweep.
//!
//! Robots need ground their mobility part supports. Loose world objects need
//! ground in their own terrain list. Grouped and carried objects are held up
//! by something else and are exempt.

use crate::components::entity::{Entity, EntityKind};
use crate::error::SimError;
use crate::resources::simworld::SimWorld;
use crate::resources::terrain::TerrainProvider;

fn is_exempt(world: &SimWorld, entity: &Entity) -> bool {
    match &entity.kind {
        EntityKind::Group(_) => true,
        EntityKind::WorldObject(data) => data.group().is_some() || world.is_carried(entity.id),
        EntityKind::Robot(_) => false,
    }
}

/// Returns the first incompatible entity, in creation order.
pub fn check_terrain(world: &SimWorld, terrain: &dyn TerrainProvider) -> Result<(), SimError> {
    for entity in world.iter() {
        if is_exempt(world, entity) {
            continue;
        }
        let pos = entity.pose().pos;
        let tile = terrain.terrain_at(pos);
        let compatible = match (&entity.kind, tile) {
            (_, None) => false,
            (EntityKind::Robot(data), Some(tile)) => data.parts.supports_terrain(tile.terrain),
            (EntityKind::WorldObject(data), Some(tile)) => data.supports_terrain(tile.terrain),
            (EntityKind::Group(_), Some(_)) => true,
        };
        if !compatible {
            return Err(SimError::TerrainViolation {
                entity: entity.name.clone(),
                pos,
                terrain: tile.map_or("void", |t| t.terrain.name()).to_string(),
            });
        }
    }
    Ok(())
}
