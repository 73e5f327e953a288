//! Events produced by the simulation.
//!
//! Submodules:
//! - [`turn`] – per-turn event log returned by `Simulation::advance_turn`
pub mod turn;
