//! Goal evaluation.
//!
//! Runs in two phases so that every goal sees the same world: first each
//! unfulfilled goal picks a candidate (a ready, matching object on its cell),
//! then candidates are consumed. Ungrouped goals consume on their own; goals
//! sharing a group tag consume only when every unfulfilled goal in the group
//! has a candidate, and then all at once.

use crate::components::goal::Goal;
use crate::events::turn::SimEvent;
use crate::resources::simworld::SimWorld;
use crate::systems::connect;
use log::info;
use std::collections::BTreeMap;

fn find_candidates(world: &SimWorld, goals: &mut [Goal]) {
    for goal in goals.iter_mut() {
        goal.candidate = None;
        if goal.fulfilled {
            continue;
        }
        let Some(occupant) = world.occupant_at(goal.pos) else {
            continue;
        };
        let Some(entity) = world.get(occupant) else {
            continue;
        };
        if goal.matches(entity) && !world.is_carried(occupant) {
            goal.candidate = Some(occupant);
        }
    }
}

/// Consumes ready objects and updates goal counts. Returns the events of the
/// phase; the caller checks for victory.
pub fn evaluate_goals(world: &mut SimWorld, goals: &mut [Goal]) -> Vec<SimEvent> {
    find_candidates(world, goals);

    let mut consume: Vec<usize> = Vec::new();
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, goal) in goals.iter().enumerate() {
        if goal.fulfilled {
            continue;
        }
        match goal.group.as_deref() {
            Some(tag) => groups.entry(tag).or_default().push(index),
            None if goal.has_fitting_object() => consume.push(index),
            None => {}
        }
    }
    for members in groups.values() {
        if members.iter().all(|i| goals[*i].has_fitting_object()) {
            consume.extend(members.iter().copied());
        }
    }
    consume.sort_unstable();

    let mut events = Vec::new();
    for index in consume {
        let Some(object) = goals[index].candidate.take() else {
            continue;
        };
        if connect::remove_object(world, object).is_none() {
            continue;
        }
        info!("goal {} consumed {}", index, object);
        events.push(SimEvent::ObjectConsumed { goal: index, object });
        if goals[index].record_delivery() {
            info!("goal {} fulfilled", index);
            events.push(SimEvent::GoalFulfilled { goal: index });
        }
    }
    events
}

pub fn all_fulfilled(goals: &[Goal]) -> bool {
    !goals.is_empty() && goals.iter().all(|g| g.fulfilled)
}
