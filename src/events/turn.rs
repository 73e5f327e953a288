//! Events produced while advancing a turn.
//!
//! Each call to `Simulation::advance_turn` returns a [`TurnReport`] with the
//! events of that turn, in the order they happened. Front ends use them for
//! logs, sound cues or UI; the simulation never reads them back.

use crate::components::entity::EntityId;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    /// An actor performed an action; `success` is false for blocked or
    /// pointless actions.
    ActionPerformed {
        actor: EntityId,
        action: &'static str,
        success: bool,
    },
    /// An actor used up its instruction budget without acting.
    AutoYielded { actor: EntityId },
    ScriptFinished { actor: EntityId },
    ActorFaulted { actor: EntityId, reason: String },
    Connected { a: EntityId, b: EntityId },
    ObjectConsumed { goal: usize, object: EntityId },
    GoalFulfilled { goal: usize },
    Spawned { spawner: usize, object: EntityId },
    /// A spawn was due but the cell was occupied.
    SpawnBlocked { spawner: usize },
    Victory,
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimEvent::ActionPerformed {
                actor,
                action,
                success,
            } => write!(f, "{} {} ({})", actor, action, if *success { "ok" } else { "failed" }),
            SimEvent::AutoYielded { actor } => write!(f, "{} ran out of instructions", actor),
            SimEvent::ScriptFinished { actor } => write!(f, "{} finished its script", actor),
            SimEvent::ActorFaulted { actor, reason } => write!(f, "{} faulted: {}", actor, reason),
            SimEvent::Connected { a, b } => write!(f, "{} connected to {}", a, b),
            SimEvent::ObjectConsumed { goal, object } => write!(f, "goal {} consumed {}", goal, object),
            SimEvent::GoalFulfilled { goal } => write!(f, "goal {} fulfilled", goal),
            SimEvent::Spawned { spawner, object } => write!(f, "spawner {} created {}", spawner, object),
            SimEvent::SpawnBlocked { spawner } => write!(f, "spawner {} is blocked", spawner),
            SimEvent::Victory => f.write_str("all goals fulfilled"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReport {
    pub turn: u64,
    pub events: Vec<SimEvent>,
}

impl TurnReport {
    pub fn new(turn: u64) -> Self {
        Self {
            turn,
            events: Vec::new(),
        }
    }

    pub fn contains(&self, event: &SimEvent) -> bool {
        self.events.contains(event)
    }
}
