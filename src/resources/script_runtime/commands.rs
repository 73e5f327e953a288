//! Requests scripts yield to the engine, and the replies they get back.
//!
//! A script calls an action such as `walk()`; the action yields its name and
//! arguments, which become an [`ActionRequest`]. The engine executes it and
//! hands the [`ActionReply`] back as the return value of that call when the
//! script is next resumed.

use crate::error::ActionError;
use mlua::{IntoLua, Lua, LuaSerdeExt, SerializeOptions, Value as LuaValue};
use serde::Serialize;

/// One primitive action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    TurnLeft,
    TurnRight,
    Wait,
    Walk,
    /// Absolute direction name, validated when executed.
    Move(String),
    Grab,
    Release,
    Weld,
    Shred,
    Paint(String),
    Sense,
    CheckGround,
    ScanSurroundings,
}

impl ActionRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ActionRequest::TurnLeft => "turnLeft",
            ActionRequest::TurnRight => "turnRight",
            ActionRequest::Wait => "wait",
            ActionRequest::Walk => "walk",
            ActionRequest::Move(_) => "move",
            ActionRequest::Grab => "grab",
            ActionRequest::Release => "release",
            ActionRequest::Weld => "weld",
            ActionRequest::Shred => "shred",
            ActionRequest::Paint(_) => "paint",
            ActionRequest::Sense => "sense",
            ActionRequest::CheckGround => "checkGround",
            ActionRequest::ScanSurroundings => "scanSurroundings",
        }
    }

    /// Builds a request from the values a script yielded.
    pub fn from_yield(name: &str, args: &[LuaValue]) -> Result<Self, ActionError> {
        Ok(match name {
            "turnLeft" => ActionRequest::TurnLeft,
            "turnRight" => ActionRequest::TurnRight,
            "wait" => ActionRequest::Wait,
            "walk" => ActionRequest::Walk,
            "move" => ActionRequest::Move(string_arg(args, "move", "a direction name")?),
            "grab" => ActionRequest::Grab,
            "release" => ActionRequest::Release,
            "weld" => ActionRequest::Weld,
            "shred" => ActionRequest::Shred,
            "paint" => ActionRequest::Paint(string_arg(args, "paint", "a colour name")?),
            "sense" => ActionRequest::Sense,
            "checkGround" => ActionRequest::CheckGround,
            "scanSurroundings" => ActionRequest::ScanSurroundings,
            other => return Err(ActionError::UnknownAction(other.to_string())),
        })
    }
}

fn string_arg(
    args: &[LuaValue],
    action: &'static str,
    expected: &'static str,
) -> Result<String, ActionError> {
    match args.first() {
        Some(LuaValue::String(s)) => Ok(String::from(s.to_string_lossy())),
        _ => Err(ActionError::BadArgument { action, expected }),
    }
}

/// What `sense()` reports about the entity ahead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenseReport {
    pub kind: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub color: Option<String>,
    pub movable: bool,
    pub grabbable: bool,
}

/// What `checkGround()` reports about the cell ahead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundReport {
    pub terrain: String,
    pub tags: Vec<String>,
}

/// Type names found in the four neighbouring cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub north: Option<String>,
    pub east: Option<String>,
    pub south: Option<String>,
    pub west: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActionReply {
    #[default]
    Nothing,
    Done(bool),
    Sensed(Option<SenseReport>),
    Ground(Option<GroundReport>),
    Scanned(ScanReport),
}

fn table_options() -> SerializeOptions {
    SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false)
}

impl IntoLua for ActionReply {
    fn into_lua(self, lua: &Lua) -> mlua::Result<LuaValue> {
        match self {
            ActionReply::Nothing => Ok(LuaValue::Nil),
            ActionReply::Done(flag) => Ok(LuaValue::Boolean(flag)),
            ActionReply::Sensed(None) | ActionReply::Ground(None) => Ok(LuaValue::Nil),
            ActionReply::Sensed(Some(report)) => lua.to_value_with(&report, table_options()),
            ActionReply::Ground(Some(report)) => lua.to_value_with(&report, table_options()),
            ActionReply::Scanned(report) => lua.to_value_with(&report, table_options()),
        }
    }
}

/// Result of resuming a script once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// The script yielded an action to execute.
    Action(ActionRequest),
    /// The instruction budget ran out before any action was called.
    AutoYield,
    /// The script ran to its end.
    Finished,
    /// The script raised an error or yielded something invalid.
    Faulted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptRunState {
    NotStarted,
    Suspended,
    Finished,
    Faulted,
}

impl ScriptRunState {
    /// Whether resuming can still produce actions.
    pub fn is_live(self) -> bool {
        matches!(self, ScriptRunState::NotStarted | ScriptRunState::Suspended)
    }
}
