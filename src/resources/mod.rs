//! Long-lived simulation state shared by the systems.
//!
//! Overview
//! - `runstate` – run state machine of a simulation
//! - `script_runtime` – Lua VM, per-actor coroutines and the action surface
//! - `simconfig` – settings loaded from an INI file
//! - `simworld` – entity store, occupancy index and carry table
//! - `terrain` – terrain types, tiles and the terrain provider seam
//! - `turnclock` – wall-clock pacing of turns
pub mod runstate;
pub mod script_runtime;
pub mod simconfig;
pub mod simworld;
pub mod terrain;
pub mod turnclock;
