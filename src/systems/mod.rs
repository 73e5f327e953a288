//! Turn phases.
//!
//! Submodules overview
//! - [`actions`] – execute one yielded action against the world
//! - [`connect`] – welding, connectivity groups and the connection sweep
//! - [`dispatch`] – resume every live actor once per turn
//! - [`goal`] – consume delivered objects and detect victory
//! - [`physics`] – movement, push chains, turning sweeps and carrying
//! - [`spawner`] – create objects on spawner cells
//! - [`terrain`] – check every entity stands on compatible ground
pub mod actions;
pub mod connect;
pub mod dispatch;
pub mod goal;
pub mod physics;
pub mod spawner;
pub mod terrain;
