//! Executes one action request for one actor.
//!
//! Physical failures (blocked, nothing to grab) are normal outcomes and come
//! back to the script as `false`. Only malformed requests are errors.

use crate::components::entity::{Entity, EntityId};
use crate::components::transform::{Direction, Turn};
use crate::error::ActionError;
use crate::resources::script_runtime::{
    ActionReply, ActionRequest, GroundReport, ScanReport, SenseReport,
};
use crate::resources::simworld::SimWorld;
use crate::resources::terrain::TerrainProvider;
use crate::systems::{connect, physics};
use log::debug;

pub fn execute(
    world: &mut SimWorld,
    terrain: &dyn TerrainProvider,
    actor: EntityId,
    request: &ActionRequest,
) -> Result<ActionReply, ActionError> {
    let Some(pose) = world.pose(actor) else {
        return Err(ActionError::MissingActor(actor));
    };

    let reply = match request {
        ActionRequest::TurnLeft => ActionReply::Done(physics::try_turn(world, actor, Turn::Left)),
        ActionRequest::TurnRight => ActionReply::Done(physics::try_turn(world, actor, Turn::Right)),
        ActionRequest::Wait => ActionReply::Nothing,
        ActionRequest::Walk => ActionReply::Done(physics::try_move(world, actor, pose.facing)),
        ActionRequest::Move(name) => {
            let dir = Direction::parse(name).ok_or_else(|| ActionError::UnknownDirection(name.clone()))?;
            ActionReply::Done(physics::try_move(world, actor, dir))
        }
        ActionRequest::Grab => ActionReply::Done(physics::grab(world, actor)),
        ActionRequest::Release => ActionReply::Done(physics::release(world, actor)),
        ActionRequest::Weld => ActionReply::Done(weld(world, actor)),
        ActionRequest::Shred => ActionReply::Done(shred(world, actor)),
        ActionRequest::Paint(color) => {
            if color.trim().is_empty() {
                return Err(ActionError::BadArgument {
                    action: "paint",
                    expected: "a colour name",
                });
            }
            ActionReply::Done(paint(world, actor, color))
        }
        ActionRequest::Sense => ActionReply::Sensed(sense(world, actor)),
        ActionRequest::CheckGround => ActionReply::Ground(terrain.terrain_at(pose.ahead()).map(|tile| {
            GroundReport {
                terrain: tile.terrain.name().to_string(),
                tags: tile.tags.clone(),
            }
        })),
        ActionRequest::ScanSurroundings => ActionReply::Scanned(scan(world, actor)),
    };
    debug!("{} {} -> {:?}", actor, request.name(), reply);
    Ok(reply)
}

/// World object directly ahead of `actor`.
fn object_ahead(world: &SimWorld, actor: EntityId) -> Option<EntityId> {
    physics::entity_ahead(world, actor).filter(|id| {
        world
            .get(*id)
            .is_some_and(|e| e.as_world_object().is_some())
    })
}

/// Opens the object ahead for connection; the sweep joins it at the end of
/// the turn.
fn weld(world: &mut SimWorld, actor: EntityId) -> bool {
    let Some(target) = object_ahead(world, actor) else {
        return false;
    };
    match world.get_mut(target).and_then(Entity::as_world_object_mut) {
        Some(data) => {
            data.open_for_connection = true;
            true
        }
        None => false,
    }
}

/// Destroys the movable object ahead.
fn shred(world: &mut SimWorld, actor: EntityId) -> bool {
    let Some(target) = object_ahead(world, actor) else {
        return false;
    };
    if !world.get(target).is_some_and(|e| e.movable) {
        return false;
    }
    connect::remove_object(world, target).is_some()
}

fn paint(world: &mut SimWorld, actor: EntityId, color: &str) -> bool {
    let Some(target) = object_ahead(world, actor) else {
        return false;
    };
    match world.get_mut(target).and_then(Entity::as_world_object_mut) {
        Some(data) => {
            data.color = Some(color.trim().to_string());
            true
        }
        None => false,
    }
}

fn sense(world: &SimWorld, actor: EntityId) -> Option<SenseReport> {
    let entity = world.get(physics::entity_ahead(world, actor)?)?;
    Some(SenseReport {
        kind: entity.kind_name().to_string(),
        object_type: entity.type_name().to_string(),
        color: entity.as_world_object().and_then(|d| d.color.clone()),
        movable: entity.movable,
        grabbable: entity.grabbable,
    })
}

fn scan(world: &SimWorld, actor: EntityId) -> ScanReport {
    let Some(pose) = world.pose(actor) else {
        return ScanReport::default();
    };
    let names: Vec<Option<String>> = physics::scan(world, pose.pos)
        .into_iter()
        .map(|hit| hit.and_then(|id| world.get(id)).map(|e| e.type_name().to_string()))
        .collect();
    let [north, east, south, west]: [Option<String>; 4] = names.try_into().unwrap_or_default();
    ScanReport {
        north,
        east,
        south,
        west,
    }
}
