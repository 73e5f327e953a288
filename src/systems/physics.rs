//! Grid physics: moving, turning, pushing and carrying.
//!
//! Everything that moves together is resolved as one rigid body rooted at a
//! single entity: a robot with whatever it carries, or a group with its
//! members (and, recursively, whatever they carry). Every move or turn is a
//! transaction. Poses are snapshotted first and restored if any member of the
//! body, or anything it had to push, ends up blocked.
//!
//! Looking one cell ahead of a member classifies the first hit as:
//! - free (nothing there, or a part of the same body),
//! - pushable (a movable, uncarried root): pushed recursively first,
//! - blocked: the whole action fails with no state change.

use crate::components::carry::Carry;
use crate::components::entity::{Entity, EntityId};
use crate::components::transform::{Attachment, Direction, GridPos, Pose, Turn};
use crate::resources::simworld::SimWorld;
use arrayvec::ArrayVec;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Free,
    Pushable(EntityId),
    Blocked(EntityId),
}

fn is_resident(world: &SimWorld, id: EntityId) -> bool {
    world.get(id).is_some_and(Entity::is_grid_resident)
}

fn membership_attachment(world: &SimWorld, id: EntityId) -> Option<Attachment> {
    world
        .get(id)
        .and_then(Entity::as_world_object)
        .and_then(|data| data.membership)
        .map(|m| m.attachment)
}

/// Poses of `root` and everything rigidly attached to it, given a pose for
/// the root.
pub fn planned_poses(world: &SimWorld, root: EntityId, root_pose: Pose) -> Vec<(EntityId, Pose)> {
    let mut out = vec![(root, root_pose)];
    let mut i = 0;
    while i < out.len() {
        let (id, pose) = out[i];
        if let Some(group) = world.get(id).and_then(Entity::as_group) {
            for member in &group.members {
                if let Some(attachment) = membership_attachment(world, *member) {
                    out.push((*member, attachment.resolve(pose)));
                }
            }
        }
        if let Some(carry) = world.carries.carried_by(id) {
            if !out.iter().any(|(other, _)| *other == carry.carried) {
                out.push((carry.carried, carry.derive(pose)));
            }
        }
        i += 1;
    }
    out
}

/// Grid-resident ids moving with `root`.
pub fn footprint(world: &SimWorld, root: EntityId) -> Vec<EntityId> {
    let Some(pose) = world.pose(root) else {
        return Vec::new();
    };
    planned_poses(world, root, pose)
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| is_resident(world, *id))
        .collect()
}

/// Classifies the occupant of `cell` for a body made of `body`.
pub fn classify(world: &SimWorld, body: &FxHashSet<EntityId>, cell: GridPos) -> Hit {
    let Some(occupant) = world.occupant_at(cell) else {
        return Hit::Free;
    };
    if body.contains(&occupant) {
        return Hit::Free;
    }
    let root = world.root_of(occupant);
    let movable = world.get(root).is_some_and(|e| e.movable);
    if movable && !world.is_carried(occupant) {
        Hit::Pushable(root)
    } else {
        Hit::Blocked(occupant)
    }
}

fn body_of(planned: &[(EntityId, Pose)]) -> FxHashSet<EntityId> {
    planned.iter().map(|(id, _)| *id).collect()
}

fn push_body(world: &mut SimWorld, root: EntityId, dir: Direction, chain: &mut Vec<EntityId>) -> bool {
    if chain.contains(&root) {
        return false;
    }
    let Some(root_pose) = world.pose(root) else {
        return false;
    };
    chain.push(root);

    let planned = planned_poses(world, root, root_pose.translated(dir));
    let body = body_of(&planned);
    for (id, pose) in &planned {
        if !is_resident(world, *id) {
            continue;
        }
        match classify(world, &body, pose.pos) {
            Hit::Free => {}
            Hit::Pushable(other) => {
                if !push_body(world, other, dir, chain) {
                    return false;
                }
                if world.occupant_at(pose.pos).is_some_and(|o| !body.contains(&o)) {
                    return false;
                }
            }
            Hit::Blocked(other) => {
                debug!("{} blocked by {} at {}", id, other, pose.pos);
                return false;
            }
        }
    }
    world.apply_poses(&planned);
    true
}

/// Can `id` start an action of its own? Carried bodies cannot.
fn free_to_act(world: &SimWorld, root: EntityId) -> bool {
    world.get(root).is_some_and(|e| e.movable) && !world.is_carried(root)
}

/// Moves `id` (and its whole body) one cell along `dir`, pushing what is in
/// the way. Returns false and leaves the world untouched when blocked.
pub fn try_move(world: &mut SimWorld, id: EntityId, dir: Direction) -> bool {
    let root = world.root_of(id);
    if !free_to_act(world, root) {
        debug!("{} cannot move on its own", id);
        return false;
    }
    let snapshot = world.capture_poses();
    let mut chain = Vec::new();
    if push_body(world, root, dir, &mut chain) {
        true
    } else {
        world.restore_poses(&snapshot);
        false
    }
}

/// Push direction for a member swinging from `from` to `to` around `pivot`.
///
/// The sweep vector is rounded to the nearest axis. An exact diagonal follows
/// the tangent of the sweep, the axis perpendicular to `pivot -> to`.
pub fn sweep_push_direction(from: GridPos, to: GridPos, pivot: GridPos) -> Option<Direction> {
    let (vx, vy) = from.delta_to(to);
    if vx == 0 && vy == 0 {
        return None;
    }
    let horizontal = Direction::from_vector(vx.signum(), 0);
    let vertical = Direction::from_vector(0, vy.signum());
    if vx.abs() > vy.abs() {
        return horizontal;
    }
    if vy.abs() > vx.abs() {
        return vertical;
    }
    let (rx, ry) = pivot.delta_to(to);
    if rx.abs() >= ry.abs() { vertical } else { horizontal }
}

/// Makes `member` the anchor of `group`, so that turning pivots on it.
pub fn reanchor_group(world: &mut SimWorld, group: EntityId, member: EntityId) {
    let Some(anchor) = world.pose(member) else {
        return;
    };
    let members: Vec<EntityId> = world
        .get(group)
        .and_then(Entity::as_group)
        .map(|g| g.members.to_vec())
        .unwrap_or_default();
    for id in members {
        let Some(pose) = world.pose(id) else {
            continue;
        };
        if let Some(membership) = world
            .get_mut(id)
            .and_then(Entity::as_world_object_mut)
            .and_then(|data| data.membership.as_mut())
        {
            membership.attachment = Attachment::between(anchor, pose);
        }
    }
    world.apply_poses(&[(group, anchor)]);

    if let Some(carry) = world.carries.remove_carried(group) {
        if let Some(carrier_pose) = world.pose(carry.carrier) {
            world
                .carries
                .insert(Carry::new(carry.carrier, carrier_pose, group, anchor));
        }
    }
}

/// Membership attachments of every member of `group`, empty for a non-group.
fn group_attachments(world: &SimWorld, group: EntityId) -> Vec<(EntityId, Attachment)> {
    world
        .get(group)
        .and_then(Entity::as_group)
        .map(|g| g.members.iter().filter_map(|m| Some((*m, membership_attachment(world, *m)?))).collect())
        .unwrap_or_default()
}

fn restore_attachments(world: &mut SimWorld, attachments: &[(EntityId, Attachment)]) {
    for (id, attachment) in attachments {
        if let Some(membership) = world
            .get_mut(*id)
            .and_then(Entity::as_world_object_mut)
            .and_then(|data| data.membership.as_mut())
        {
            membership.attachment = *attachment;
        }
    }
}

/// Turns `id` a quarter turn in place, swinging whatever it carries or the
/// group it belongs to. Overlaps along the sweep are pushed; if any push
/// fails the turn is undone.
pub fn try_turn(world: &mut SimWorld, id: EntityId, turn: Turn) -> bool {
    let root = world.root_of(id);
    if world.is_carried(root) {
        debug!("{} cannot turn while carried", id);
        return false;
    }
    let snapshot = world.capture_poses();
    let attachments = group_attachments(world, root);
    if root != id {
        reanchor_group(world, root, id);
    }
    let undo = |world: &mut SimWorld| {
        world.restore_poses(&snapshot);
        restore_attachments(world, &attachments);
    };
    let Some(root_pose) = world.pose(root) else {
        undo(world);
        return false;
    };
    let pivot = root_pose.pos;

    let before: FxHashMap<EntityId, Pose> = planned_poses(world, root, root_pose).into_iter().collect();
    let planned = planned_poses(world, root, root_pose.turned(turn));
    let body = body_of(&planned);

    for (member, pose) in &planned {
        if !is_resident(world, *member) {
            continue;
        }
        match classify(world, &body, pose.pos) {
            Hit::Free => {}
            Hit::Pushable(other) => {
                let from = before.get(member).map(|p| p.pos).unwrap_or(pose.pos);
                let pushed = sweep_push_direction(from, pose.pos, pivot)
                    .is_some_and(|dir| push_body(world, other, dir, &mut vec![root]));
                if !pushed {
                    debug!("{} could not sweep {} out of the way", member, other);
                    undo(world);
                    return false;
                }
            }
            Hit::Blocked(other) => {
                debug!("turn of {} blocked by {} at {}", id, other, pose.pos);
                undo(world);
                return false;
            }
        }
    }

    let clear = planned.iter().all(|(member, pose)| {
        !is_resident(world, *member) || world.occupant_at(pose.pos).is_none_or(|o| body.contains(&o))
    });
    if !clear {
        undo(world);
        return false;
    }
    world.apply_poses(&planned);
    true
}

/// The entity directly in front of `id`.
pub fn entity_ahead(world: &SimWorld, id: EntityId) -> Option<EntityId> {
    world.pose(id).and_then(|pose| world.occupant_at(pose.ahead()))
}

/// The grabbable world object ahead of `id`, if any.
pub fn grabbable_ahead(world: &SimWorld, id: EntityId) -> Option<EntityId> {
    entity_ahead(world, id).filter(|target| {
        world
            .get(*target)
            .is_some_and(|e| e.grabbable && e.as_world_object().is_some())
    })
}

/// Occupants of the four neighbouring cells, in N, E, S, W order.
pub fn scan(world: &SimWorld, pos: GridPos) -> ArrayVec<Option<EntityId>, 4> {
    Direction::ALL
        .iter()
        .map(|dir| world.occupant_at(pos.offset(*dir)))
        .collect()
}

/// `robot` takes hold of the grabbable object ahead, or of its whole group.
pub fn grab(world: &mut SimWorld, robot: EntityId) -> bool {
    let Some(robot_pose) = world.pose(robot) else {
        return false;
    };
    if world.carries.carried_by(robot).is_some() {
        debug!("{} already carries something", robot);
        return false;
    }
    let Some(target) = grabbable_ahead(world, robot) else {
        return false;
    };
    let root = world.root_of(target);
    if world.carries.carrier_of(root).is_some() {
        debug!("{} is already carried", target);
        return false;
    }
    if root != target {
        reanchor_group(world, root, target);
    }
    let Some(root_pose) = world.pose(root) else {
        return false;
    };
    world
        .carries
        .insert(Carry::new(robot, robot_pose, root, root_pose))
}

/// Drops whatever `robot` carries. Returns whether it carried anything.
pub fn release(world: &mut SimWorld, robot: EntityId) -> bool {
    world.carries.remove_by_carrier(robot).is_some()
}
