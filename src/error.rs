//! Error types.
//!
//! [`SimError`] covers conditions that end a run or prevent one from
//! starting. [`ActionError`] is a fault in a single action request; it stops
//! only the actor that issued it.

use crate::components::entity::EntityId;
use crate::components::transform::GridPos;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("script of '{actor}' does not compile: {message}")]
    Compile { actor: String, message: String },

    #[error("script of '{actor}' calls '{token}' on line {line}, which it is not allowed to use")]
    Validation {
        actor: String,
        token: String,
        line: usize,
    },

    #[error("'{entity}' cannot stand on {terrain} terrain at {pos}")]
    TerrainViolation {
        entity: String,
        pos: GridPos,
        terrain: String,
    },

    #[error("cannot {action} while the simulation is {state}")]
    NotRunning { action: &'static str, state: String },

    #[error("invalid scenario: {0}")]
    Scenario(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("'{0}' is not a direction (expected north, east, south or west)")]
    UnknownDirection(String),

    #[error("{action} expects {expected}")]
    BadArgument {
        action: &'static str,
        expected: &'static str,
    },

    #[error("actor {0} no longer exists")]
    MissingActor(EntityId),
}
