//! Entity data.
//!
//! Plain data types describing what lives on the grid. Behaviour lives in
//! [`crate::systems`].
//!
//! Submodules overview:
//! - [`carry`] – carrier/carried links and their rigid attachments
//! - [`entity`] – entity ids, kinds and the common entity record
//! - [`goal`] – delivery cells and their match rules
//! - [`part`] – robot parts and the actions they grant
//! - [`spawner`] – cells that periodically create objects
//! - [`transform`] – grid positions, directions and poses
//! - [`worldobject`] – object data, connection slots and group membership

pub mod carry;
pub mod entity;
pub mod goal;
pub mod part;
pub mod spawner;
pub mod transform;
pub mod worldobject;
