//! Lua scripting for actors.
//!
//! Every robot and scripted world object runs its own Lua coroutine. A script
//! is written as straight-line code calling actions (`walk()`, `grab()`,
//! `turnLeft()`...); each call suspends the script until the engine's next
//! turn, and returns the action's result.
//!
//! # Architecture
//!
//! - [`commands`] - action requests, replies and step results
//! - [`validate`] - static check of the names a script calls
//! - [`runtime`] - the Lua state, sandboxed environments and coroutines
//! - [`scheduler`] - per-actor bookkeeping driven by the turn loop
//!
//! # Example
//!
//! ```lua
//! -- A robot with legs, an arm and a sensor
//! while true do
//!     local ahead = sense()
//!     if ahead and ahead.type == "crate" then
//!         grab()
//!         turnLeft()
//!         turnLeft()
//!     elseif not walk() then
//!         turnRight()
//!     end
//! end
//! ```

pub mod commands;
pub mod runtime;
pub mod scheduler;
pub mod validate;

pub use commands::*;
pub use runtime::{LuaScript, ScriptRuntime};
pub use scheduler::{ActorScript, ScriptScheduler};
