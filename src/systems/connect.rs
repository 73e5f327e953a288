//! Connectivity grouping.
//!
//! Welded world objects are joined by symmetric edges stored in their
//! connection slots. A group entity holds exactly the members of one
//! connected component of that graph: it is created when two loose objects
//! connect, absorbs loose objects, merges with other groups, and is split
//! again by a reachability check whenever an edge disappears. A group with
//! fewer than two members is dissolved.
//!
//! Carrying survives all of this: if a carried object or group is folded
//! into a bigger one, the carrier ends up holding the result.

use crate::components::carry::Carry;
use crate::components::entity::{Entity, EntityId};
use crate::components::transform::Attachment;
use crate::components::worldobject::{ConnectionSlot, Membership};
use crate::resources::simworld::SimWorld;
use crate::systems::physics;
use log::{debug, info};
use rustc_hash::FxHashSet;
use std::collections::{BTreeSet, VecDeque};

pub fn same_group(world: &SimWorld, a: EntityId, b: EntityId) -> bool {
    let ga = world.get(a).and_then(Entity::group_id);
    ga.is_some() && ga == world.get(b).and_then(Entity::group_id)
}

pub fn group_members(world: &SimWorld, group: EntityId) -> Vec<EntityId> {
    world
        .get(group)
        .and_then(Entity::as_group)
        .map(|g| g.members.to_vec())
        .unwrap_or_default()
}

fn retarget_carry(world: &mut SimWorld, carrier: EntityId, target: EntityId) {
    world.carries.remove_by_carrier(carrier);
    if let (Some(carrier_pose), Some(target_pose)) = (world.pose(carrier), world.pose(target)) {
        world
            .carries
            .insert(Carry::new(carrier, carrier_pose, target, target_pose));
    }
}

fn refresh_group_movable(world: &mut SimWorld, group: EntityId) {
    let movable = group_members(world, group)
        .iter()
        .all(|m| world.get(*m).is_some_and(|e| e.movable));
    if let Some(entity) = world.get_mut(group) {
        entity.movable = movable;
    }
}

fn add_to_group(world: &mut SimWorld, group: EntityId, member: EntityId) {
    let (Some(anchor), Some(pose)) = (world.pose(group), world.pose(member)) else {
        return;
    };
    let attachment = Attachment::between(anchor, pose);
    if let Some(data) = world.get_mut(member).and_then(Entity::as_world_object_mut) {
        data.membership = Some(Membership { group, attachment });
    }
    if let Some(data) = world.get_mut(group).and_then(Entity::as_group_mut) {
        if !data.members.contains(&member) {
            data.members.push(member);
        }
    }
    refresh_group_movable(world, group);
}

fn detach_from_group(world: &mut SimWorld, group: EntityId, member: EntityId) {
    if let Some(data) = world.get_mut(member).and_then(Entity::as_world_object_mut) {
        data.membership = None;
    }
    if let Some(data) = world.get_mut(group).and_then(Entity::as_group_mut) {
        data.members.retain(|m| *m != member);
    }
}

/// Creates a group anchored on the first of `members`.
pub fn create_group(world: &mut SimWorld, members: &[EntityId]) -> Option<EntityId> {
    let anchor = world.pose(*members.first()?)?;
    let group = world.spawn(Entity::group("group", anchor).with_persistent(false))?;
    if let Some(entity) = world.get_mut(group) {
        entity.name = format!("group{}", group.0);
    }
    for member in members {
        add_to_group(world, group, *member);
    }
    debug!("created {} with {} members", group, members.len());
    Some(group)
}

/// Re-parents every member of `absorb` into `keep` and removes `absorb`.
pub fn merge_groups(world: &mut SimWorld, keep: EntityId, absorb: EntityId) {
    if keep == absorb {
        return;
    }
    let absorbed_carry = world.carries.get(absorb).copied();
    for member in group_members(world, absorb) {
        add_to_group(world, keep, member);
    }
    world.remove(absorb);
    if let Some(carry) = absorbed_carry {
        if world.carries.carrier_of(keep).is_none() {
            retarget_carry(world, carry.carrier, keep);
        }
    }
    debug!("merged {} into {}", absorb, keep);
}

/// Members of `within` reachable from `start` over connection edges, sorted.
fn component_from(world: &SimWorld, start: EntityId, within: &FxHashSet<EntityId>) -> Vec<EntityId> {
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        let Some(data) = world.get(id).and_then(Entity::as_world_object) else {
            continue;
        };
        for next in data.neighbours() {
            if within.contains(&next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen.into_iter().collect()
}

/// Re-partitions `group` into its connected components.
///
/// The component holding the group's anchor member keeps the group entity
/// (and any carry on it). Other components of two or more become new
/// groups; single objects leave grouping.
pub fn split_group(world: &mut SimWorld, group: EntityId) {
    let members = group_members(world, group);
    let within: FxHashSet<EntityId> = members.iter().copied().collect();

    let mut seen = FxHashSet::default();
    let mut components: Vec<Vec<EntityId>> = Vec::new();
    for member in &members {
        if seen.contains(member) {
            continue;
        }
        let component = component_from(world, *member, &within);
        seen.extend(component.iter().copied());
        components.push(component);
    }
    if components.len() == 1 && components[0].len() >= 2 {
        return;
    }

    let anchor_member = members.iter().copied().find(|m| {
        world
            .get(*m)
            .and_then(Entity::as_world_object)
            .and_then(|d| d.membership)
            .is_some_and(|ms| ms.attachment.offset == (0, 0))
    });
    let keep_index = anchor_member
        .and_then(|a| components.iter().position(|c| c.contains(&a)))
        .or_else(|| {
            components
                .iter()
                .enumerate()
                .max_by_key(|(_, c)| c.len())
                .map(|(i, _)| i)
        })
        .unwrap_or(0);

    for (index, component) in components.iter().enumerate() {
        if index == keep_index {
            continue;
        }
        for member in component {
            detach_from_group(world, group, *member);
        }
        if component.len() >= 2 {
            create_group(world, component);
        }
    }

    let kept = components.get(keep_index).cloned().unwrap_or_default();
    if kept.len() < 2 {
        let carry = world.carries.get(group).copied();
        for member in &kept {
            detach_from_group(world, group, *member);
        }
        world.remove(group);
        if let (Some(carry), [single]) = (carry, kept.as_slice()) {
            retarget_carry(world, carry.carrier, *single);
        }
        debug!("dissolved {}", group);
    } else {
        refresh_group_movable(world, group);
    }
}

/// Joins two adjacent world objects whose facing slots are free.
pub fn attempt_connect(world: &mut SimWorld, a: EntityId, b: EntityId) -> bool {
    if a == b {
        return false;
    }
    let (Some(ea), Some(eb)) = (world.get(a), world.get(b)) else {
        return false;
    };
    let (Some(data_a), Some(data_b)) = (ea.as_world_object(), eb.as_world_object()) else {
        return false;
    };
    let (pa, pb) = (ea.pose(), eb.pose());
    if pa.pos.manhattan(pb.pos) != 1 || data_a.is_connected_to(b) {
        return false;
    }
    let (Some(slot_a), Some(slot_b)) = (
        ConnectionSlot::toward(pa.facing, pa.pos.delta_to(pb.pos)),
        ConnectionSlot::toward(pb.facing, pb.pos.delta_to(pa.pos)),
    ) else {
        return false;
    };
    if !data_a.slot_free(slot_a) || !data_b.slot_free(slot_b) {
        return false;
    }

    let (root_a, root_b) = (world.root_of(a), world.root_of(b));
    let carry_a = world.carries.get(root_a).copied();
    let carry_b = world.carries.get(root_b).copied();
    if root_a != root_b {
        match (carry_a, carry_b) {
            (Some(_), Some(_)) => return false,
            (Some(_), None) if !world.get(root_b).is_some_and(|e| e.movable) => return false,
            (None, Some(_)) if !world.get(root_a).is_some_and(|e| e.movable) => return false,
            _ => {}
        }
    }

    if let Some(data) = world.get_mut(a).and_then(Entity::as_world_object_mut) {
        data.connect(slot_a, b);
    }
    if let Some(data) = world.get_mut(b).and_then(Entity::as_world_object_mut) {
        data.connect(slot_b, a);
    }

    let group_a = world.get(a).and_then(Entity::group_id);
    let group_b = world.get(b).and_then(Entity::group_id);
    match (group_a, group_b) {
        (None, None) => {
            create_group(world, &[a, b]);
        }
        (Some(g), None) => add_to_group(world, g, b),
        (None, Some(g)) => add_to_group(world, g, a),
        (Some(ga), Some(gb)) if ga != gb => merge_groups(world, ga, gb),
        _ => {}
    }

    if let Some(carry) = carry_a.or(carry_b) {
        let root = world.root_of(a);
        if world.carries.carrier_of(root) != Some(carry.carrier) {
            retarget_carry(world, carry.carrier, root);
        }
    }
    true
}

/// Removes the edge between `a` and `b` and splits their group if the edge
/// was holding it together.
pub fn disconnect(world: &mut SimWorld, a: EntityId, b: EntityId) -> bool {
    let removed_a = world
        .get_mut(a)
        .and_then(Entity::as_world_object_mut)
        .is_some_and(|d| d.disconnect(b));
    let removed_b = world
        .get_mut(b)
        .and_then(Entity::as_world_object_mut)
        .is_some_and(|d| d.disconnect(a));
    if !removed_a && !removed_b {
        return false;
    }
    let group = world
        .get(a)
        .and_then(Entity::group_id)
        .or_else(|| world.get(b).and_then(Entity::group_id));
    if let Some(group) = group {
        split_group(world, group);
    }
    true
}

/// Disconnects `id` from everything and removes it from the world.
pub fn remove_object(world: &mut SimWorld, id: EntityId) -> Option<Entity> {
    let neighbours = world
        .get(id)
        .and_then(Entity::as_world_object)
        .map(|d| d.neighbours())
        .unwrap_or_default();
    for neighbour in neighbours {
        disconnect(world, id, neighbour);
    }
    if let Some(group) = world.get(id).and_then(Entity::group_id) {
        detach_from_group(world, group, id);
        split_group(world, group);
    }
    world.remove(id)
}

/// Whether `candidate` may be welded to the open object `open` this sweep:
/// another open object later in id order, or a closed member of a group.
fn sweep_partner(world: &SimWorld, open: EntityId, candidate: EntityId) -> bool {
    match world.get(candidate).and_then(Entity::as_world_object) {
        Some(data) if data.open_for_connection => candidate > open,
        Some(data) => data.group().is_some(),
        None => false,
    }
}

/// Welds every open object to its adjacent partners, in id order, then
/// closes every object that connected. Partners are other open objects and
/// members of existing groups, so an object opened next to a group joins it.
/// Returns the pairs joined.
pub fn connection_sweep(world: &mut SimWorld) -> Vec<(EntityId, EntityId)> {
    let open: Vec<EntityId> = world
        .iter()
        .filter(|e| e.as_world_object().is_some_and(|d| d.open_for_connection))
        .map(|e| e.id)
        .collect();

    let mut pairs = Vec::new();
    let mut connected = BTreeSet::new();
    for a in open {
        let Some(pos) = world.pose(a).map(|p| p.pos) else {
            continue;
        };
        for b in physics::scan(world, pos).into_iter().flatten() {
            if !sweep_partner(world, a, b) || same_group(world, a, b) {
                continue;
            }
            if attempt_connect(world, a, b) {
                info!("connected {} and {}", a, b);
                connected.insert(a);
                connected.insert(b);
                pairs.push((a, b));
            }
        }
    }
    for id in connected {
        if let Some(data) = world.get_mut(id).and_then(Entity::as_world_object_mut) {
            data.open_for_connection = false;
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::part::PartSet;
    use crate::components::transform::{Direction, Pose, Turn};
    use crate::components::worldobject::WorldObjectData;
    use crate::systems::physics;

    fn object(world: &mut SimWorld, x: i32, y: i32) -> EntityId {
        world
            .spawn(Entity::world_object(
                "block",
                Pose::at(x, y, Direction::North),
                WorldObjectData::new("block"),
            ))
            .unwrap()
    }

    fn open(world: &mut SimWorld, id: EntityId) {
        if let Some(data) = world.get_mut(id).and_then(Entity::as_world_object_mut) {
            data.open_for_connection = true;
        }
    }

    fn group_of(world: &SimWorld, id: EntityId) -> Option<EntityId> {
        world.get(id).and_then(Entity::group_id)
    }

    /// Every group's members form exactly one connected component.
    fn assert_groups_are_components(world: &SimWorld) {
        for entity in world.iter() {
            let Some(group) = entity.as_group() else {
                continue;
            };
            assert!(group.members.len() >= 2, "{} is undersized", entity.id);
            let within: FxHashSet<EntityId> = group.members.iter().copied().collect();
            let component = component_from(world, group.members[0], &within);
            assert_eq!(component.len(), group.members.len());
            for member in &group.members {
                assert_eq!(group_of(world, *member), Some(entity.id));
                let data = world.get(*member).unwrap().as_world_object().unwrap();
                for n in data.neighbours() {
                    assert!(within.contains(&n), "edge leaves the group");
                }
            }
        }
    }

    #[test]
    fn connecting_two_objects_creates_group() {
        let mut world = SimWorld::new();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 1, 0);
        assert!(attempt_connect(&mut world, a, b));
        let group = group_of(&world, a).unwrap();
        assert_eq!(group_of(&world, b), Some(group));
        assert!(!attempt_connect(&mut world, a, b));
        assert_groups_are_components(&world);
    }

    #[test]
    fn non_adjacent_objects_do_not_connect() {
        let mut world = SimWorld::new();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 1, 1);
        assert!(!attempt_connect(&mut world, a, b));
        assert!(group_of(&world, a).is_none());
    }

    #[test]
    fn groups_merge_and_split() {
        let mut world = SimWorld::new();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 1, 0);
        let c = object(&mut world, 2, 0);
        let d = object(&mut world, 3, 0);
        attempt_connect(&mut world, a, b);
        attempt_connect(&mut world, c, d);
        assert_ne!(group_of(&world, a), group_of(&world, c));

        assert!(attempt_connect(&mut world, b, c));
        assert_eq!(group_of(&world, a), group_of(&world, d));
        assert_groups_are_components(&world);

        assert!(disconnect(&mut world, b, c));
        assert_ne!(group_of(&world, a), group_of(&world, c));
        assert!(group_of(&world, a).is_some());
        assert!(group_of(&world, c).is_some());
        assert_groups_are_components(&world);
    }

    #[test]
    fn split_leaving_singletons_dissolves_group() {
        let mut world = SimWorld::new();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 1, 0);
        attempt_connect(&mut world, a, b);
        let group = group_of(&world, a).unwrap();
        assert!(disconnect(&mut world, a, b));
        assert!(group_of(&world, a).is_none());
        assert!(group_of(&world, b).is_none());
        assert!(!world.contains(group));
    }

    #[test]
    fn cycle_keeps_group_after_one_cut() {
        let mut world = SimWorld::new();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 1, 0);
        let c = object(&mut world, 1, 1);
        let d = object(&mut world, 0, 1);
        attempt_connect(&mut world, a, b);
        attempt_connect(&mut world, b, c);
        attempt_connect(&mut world, c, d);
        attempt_connect(&mut world, d, a);
        let group = group_of(&world, a).unwrap();

        disconnect(&mut world, a, b);
        for id in [a, b, c, d] {
            assert_eq!(group_of(&world, id), Some(group));
        }
        assert_groups_are_components(&world);
    }

    #[test]
    fn removing_middle_object_splits_chain() {
        let mut world = SimWorld::new();
        let ids: Vec<EntityId> = (0..5).map(|x| object(&mut world, x, 0)).collect();
        for pair in ids.windows(2) {
            attempt_connect(&mut world, pair[0], pair[1]);
        }
        remove_object(&mut world, ids[2]);
        assert!(!world.contains(ids[2]));
        assert_eq!(group_of(&world, ids[0]), group_of(&world, ids[1]));
        assert_eq!(group_of(&world, ids[3]), group_of(&world, ids[4]));
        assert_ne!(group_of(&world, ids[0]), group_of(&world, ids[3]));
        assert_groups_are_components(&world);
    }

    #[test]
    fn group_moves_and_turns_as_one() {
        let mut world = SimWorld::new();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 0, 1);
        attempt_connect(&mut world, a, b);

        assert!(physics::try_move(&mut world, a, Direction::East));
        assert_eq!(world.pose(a).unwrap().pos, crate::components::transform::GridPos::new(1, 0));
        assert_eq!(world.pose(b).unwrap().pos, crate::components::transform::GridPos::new(1, 1));

        // b turns right and pivots the pair around itself.
        assert!(physics::try_turn(&mut world, b, Turn::Right));
        assert_eq!(world.pose(b).unwrap().pos, crate::components::transform::GridPos::new(1, 1));
        assert_eq!(world.pose(a).unwrap().pos, crate::components::transform::GridPos::new(0, 1));
        assert_eq!(world.pose(a).unwrap().facing, Direction::East);
    }

    #[test]
    fn carried_object_keeps_carrier_after_connecting() {
        let mut world = SimWorld::new();
        let bot = world
            .spawn(Entity::robot("bot", Pose::at(0, -1, Direction::North), PartSet::new()))
            .unwrap();
        let held = object(&mut world, 0, 0);
        let loose = object(&mut world, 1, 0);
        assert!(physics::grab(&mut world, bot));

        assert!(attempt_connect(&mut world, held, loose));
        let group = group_of(&world, held).unwrap();
        assert_eq!(world.carries.carrier_of(group), Some(bot));
        assert!(world.is_carried(loose));

        assert!(physics::try_move(&mut world, bot, Direction::West));
        assert_eq!(world.pose(loose).unwrap().pos, crate::components::transform::GridPos::new(0, 0));
    }

    #[test]
    fn objects_held_by_different_carriers_do_not_connect() {
        let mut world = SimWorld::new();
        let left = world
            .spawn(Entity::robot("left", Pose::at(0, -1, Direction::North), PartSet::new()))
            .unwrap();
        let right = world
            .spawn(Entity::robot("right", Pose::at(1, -1, Direction::North), PartSet::new()))
            .unwrap();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 1, 0);
        assert!(physics::grab(&mut world, left));
        assert!(physics::grab(&mut world, right));
        assert!(!attempt_connect(&mut world, a, b));
    }

    #[test]
    fn sweep_connects_open_objects_and_closes_them() {
        let mut world = SimWorld::new();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 1, 0);
        let c = object(&mut world, 5, 5);
        open(&mut world, a);
        open(&mut world, b);
        open(&mut world, c);

        let pairs = connection_sweep(&mut world);
        assert_eq!(pairs, vec![(a, b)]);
        assert!(same_group(&world, a, b));
        let still_open = |id| world.get(id).unwrap().as_world_object().unwrap().open_for_connection;
        assert!(!still_open(a));
        assert!(!still_open(b));
        assert!(still_open(c));
    }

    #[test]
    fn closed_objects_are_not_swept() {
        let mut world = SimWorld::new();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 1, 0);
        open(&mut world, a);
        assert!(connection_sweep(&mut world).is_empty());
        assert!(!same_group(&world, a, b));
    }

    #[test]
    fn object_opened_next_to_a_group_joins_it() {
        let mut world = SimWorld::new();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 1, 0);
        let c = object(&mut world, 2, 0);
        open(&mut world, a);
        open(&mut world, b);
        assert_eq!(connection_sweep(&mut world), vec![(a, b)]);
        assert!(group_of(&world, c).is_none());

        open(&mut world, c);
        assert_eq!(connection_sweep(&mut world), vec![(c, b)]);
        assert!(same_group(&world, a, c));
        assert!(!world.get(c).unwrap().as_world_object().unwrap().open_for_connection);
        assert_groups_are_components(&world);
    }

    #[test]
    fn closed_loose_neighbours_are_not_partners() {
        let mut world = SimWorld::new();
        let a = object(&mut world, 0, 0);
        let b = object(&mut world, 1, 0);
        open(&mut world, b);
        assert!(connection_sweep(&mut world).is_empty());
        assert!(group_of(&world, a).is_none());
    }
}
