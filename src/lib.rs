//! Gridbots library.
//!
//! A turn-based grid puzzle engine: robots and world objects live on integer
//! cells, scripted actors yield one action per turn from Lua coroutines, and
//! welded objects move as rigid groups. This crate exposes the components,
//! resources, systems and events for front ends, integration tests and the
//! headless `gridbots` runner.

pub mod components;
pub mod error;
pub mod events;
pub mod game;
pub mod resources;
pub mod scenario;
pub mod systems;

pub use error::{ActionError, SimError};
pub use game::Simulation;
pub use scenario::Scenario;
