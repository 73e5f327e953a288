//! Run state of a simulation.
//!
//! `Idle -> Running <-> Paused`, with `Victory` and `Stopped` as terminal
//! states until the next reset. Only `Running` advances turns.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    Victory,
    /// A fatal error ended the run.
    Stopped(String),
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Victory | RunState::Stopped(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Victory => "won",
            RunState::Stopped(_) => "stopped",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Stopped(reason) => write!(f, "stopped ({})", reason),
            other => f.write_str(other.name()),
        }
    }
}
