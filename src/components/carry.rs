//! Carry relation between a robot and the object it holds.
//!
//! A [`Carry`] records where the carried entity sat relative to its carrier
//! at grab time. The carried transform is never written directly while the
//! relation exists; it is always derived from the carrier's pose through the
//! stored [`Attachment`]. The [`CarryTable`] is the single owner of these
//! relations and is indexed both ways.

use crate::components::entity::EntityId;
use crate::components::transform::{Attachment, Pose};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carry {
    pub carrier: EntityId,
    pub carried: EntityId,
    pub attachment: Attachment,
}

impl Carry {
    pub fn new(carrier: EntityId, carrier_pose: Pose, carried: EntityId, carried_pose: Pose) -> Self {
        Self {
            carrier,
            carried,
            attachment: Attachment::between(carrier_pose, carried_pose),
        }
    }

    /// Pose of the carried entity for the given carrier pose.
    pub fn derive(&self, carrier_pose: Pose) -> Pose {
        self.attachment.resolve(carrier_pose)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CarryTable {
    by_carried: FxHashMap<EntityId, Carry>,
    by_carrier: FxHashMap<EntityId, EntityId>,
}

impl CarryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `carry`. Refuses when either side already takes part in a
    /// carry.
    pub fn insert(&mut self, carry: Carry) -> bool {
        if self.by_carried.contains_key(&carry.carried) || self.by_carrier.contains_key(&carry.carrier) {
            return false;
        }
        self.by_carrier.insert(carry.carrier, carry.carried);
        self.by_carried.insert(carry.carried, carry);
        true
    }

    pub fn carrier_of(&self, carried: EntityId) -> Option<EntityId> {
        self.by_carried.get(&carried).map(|c| c.carrier)
    }

    pub fn carried_by(&self, carrier: EntityId) -> Option<&Carry> {
        self.by_carrier
            .get(&carrier)
            .and_then(|carried| self.by_carried.get(carried))
    }

    pub fn get(&self, carried: EntityId) -> Option<&Carry> {
        self.by_carried.get(&carried)
    }

    pub fn remove_carried(&mut self, carried: EntityId) -> Option<Carry> {
        let carry = self.by_carried.remove(&carried)?;
        self.by_carrier.remove(&carry.carrier);
        Some(carry)
    }

    pub fn remove_by_carrier(&mut self, carrier: EntityId) -> Option<Carry> {
        let carried = self.by_carrier.remove(&carrier)?;
        self.by_carried.remove(&carried)
    }

    /// Drops every relation `id` takes part in.
    pub fn forget(&mut self, id: EntityId) {
        self.remove_carried(id);
        self.remove_by_carrier(id);
    }

    pub fn len(&self) -> usize {
        self.by_carried.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_carried.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Carry> {
        self.by_carried.values()
    }
}
