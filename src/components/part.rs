//! Robot parts.
//!
//! A part belongs to one [`PartCategory`] and grants the action names a
//! robot's script may call. Mobility parts also decide which terrain the
//! robot can stand on. A [`PartSet`] holds at most one tool and one mobility
//! part; sensors stack.

use crate::resources::terrain::TerrainType;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Actions every actor may call regardless of parts.
pub const UNIVERSAL_ACTIONS: [&str; 3] = ["turnLeft", "turnRight", "wait"];

/// Actions granted to scripted world objects.
pub const WORLD_OBJECT_ACTIONS: [&str; 4] = ["turnLeft", "turnRight", "walk", "wait"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartCategory {
    Tool,
    Mobility,
    Sensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Part {
    BasicArm,
    WeldingTool,
    ShreddingTool,
    PaintingTool,
    BasicLeg,
    SpiderLeg,
    Boat,
    BasicSensor,
    GroundSensor,
    Scanner,
}

impl Part {
    pub fn category(self) -> PartCategory {
        match self {
            Part::BasicArm | Part::WeldingTool | Part::ShreddingTool | Part::PaintingTool => {
                PartCategory::Tool
            }
            Part::BasicLeg | Part::SpiderLeg | Part::Boat => PartCategory::Mobility,
            Part::BasicSensor | Part::GroundSensor | Part::Scanner => PartCategory::Sensor,
        }
    }

    pub fn grants(self) -> &'static [&'static str] {
        match self {
            Part::BasicArm => &["grab", "release"],
            Part::WeldingTool => &["weld"],
            Part::ShreddingTool => &["shred"],
            Part::PaintingTool => &["paint"],
            Part::BasicLeg => &["walk"],
            Part::SpiderLeg => &["walk", "move"],
            Part::Boat => &["walk"],
            Part::BasicSensor => &["sense"],
            Part::GroundSensor => &["checkGround"],
            Part::Scanner => &["scanSurroundings"],
        }
    }

    /// Terrains a mobility part can stand on. Empty for other categories.
    pub fn terrains(self) -> &'static [TerrainType] {
        match self {
            Part::BasicLeg | Part::SpiderLeg => &[TerrainType::Solid],
            Part::Boat => &[TerrainType::Liquid],
            _ => &[],
        }
    }

    pub fn is_compatible(self, terrain: TerrainType) -> bool {
        self.terrains().contains(&terrain)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartSet {
    parts: SmallVec<[Part; 4]>,
}

impl PartSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `part`, returning the part it displaced when the category
    /// only allows one.
    pub fn install(&mut self, part: Part) -> Option<Part> {
        let category = part.category();
        let mut replaced = None;
        if category != PartCategory::Sensor {
            if let Some(index) = self.parts.iter().position(|p| p.category() == category) {
                replaced = Some(self.parts.remove(index));
            }
        } else if self.parts.contains(&part) {
            return None;
        }
        self.parts.push(part);
        replaced
    }

    pub fn remove(&mut self, part: Part) -> bool {
        match self.parts.iter().position(|p| *p == part) {
            Some(index) => {
                self.parts.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Part> + '_ {
        self.parts.iter().copied()
    }

    pub fn contains(&self, part: Part) -> bool {
        self.parts.contains(&part)
    }

    pub fn mobility(&self) -> Option<Part> {
        self.iter().find(|p| p.category() == PartCategory::Mobility)
    }

    pub fn tool(&self) -> Option<Part> {
        self.iter().find(|p| p.category() == PartCategory::Tool)
    }

    /// Universal actions plus everything the installed parts grant.
    pub fn granted_actions(&self) -> BTreeSet<&'static str> {
        let mut actions: BTreeSet<&'static str> = UNIVERSAL_ACTIONS.into_iter().collect();
        for part in self.iter() {
            actions.extend(part.grants().iter().copied());
        }
        actions
    }

    /// A robot without mobility parts only stands on solid ground.
    pub fn supports_terrain(&self, terrain: TerrainType) -> bool {
        match self.mobility() {
            Some(part) => part.is_compatible(terrain),
            None => terrain == TerrainType::Solid,
        }
    }
}

impl FromIterator<Part> for PartSet {
    fn from_iter<I: IntoIterator<Item = Part>>(iter: I) -> Self {
        let mut set = PartSet::new();
        for part in iter {
            set.install(part);
        }
        set
    }
}
