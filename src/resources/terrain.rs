//! Terrain beneath the grid.
//!
//! The simulation only asks one question of the ground: what tile lies under
//! a given cell. [`TerrainProvider`] is that seam; [`GridTerrain`] is the
//! bundled implementation used by scenario files, a sparse map of tiles with
//! an optional default for unlisted cells.

use crate::components::transform::GridPos;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainType {
    Solid,
    Liquid,
}

impl TerrainType {
    pub fn name(self) -> &'static str {
        match self {
            TerrainType::Solid => "solid",
            TerrainType::Liquid => "liquid",
        }
    }
}

impl fmt::Display for TerrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub terrain: TerrainType,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Tile {
    pub fn new(terrain: TerrainType) -> Self {
        Self {
            terrain,
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Source of ground tiles. A cell with no tile is compatible with nothing.
pub trait TerrainProvider {
    fn terrain_at(&self, pos: GridPos) -> Option<&Tile>;
}

#[derive(Debug, Clone, Default)]
pub struct GridTerrain {
    default: Option<Tile>,
    tiles: FxHashMap<GridPos, Tile>,
}

impl GridTerrain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terrain where every unlisted cell is `terrain`.
    pub fn filled(terrain: TerrainType) -> Self {
        Self::new().with_default(Tile::new(terrain))
    }

    pub fn with_default(mut self, tile: Tile) -> Self {
        self.default = Some(tile);
        self
    }

    pub fn set_tile(&mut self, pos: GridPos, tile: Tile) {
        self.tiles.insert(pos, tile);
    }

    pub fn with_tile(mut self, pos: GridPos, tile: Tile) -> Self {
        self.set_tile(pos, tile);
        self
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TerrainProvider for GridTerrain {
    fn terrain_at(&self, pos: GridPos) -> Option<&Tile> {
        self.tiles.get(&pos).or(self.default.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_tiles_override_default() {
        let terrain = GridTerrain::filled(TerrainType::Solid)
            .with_tile(GridPos::new(2, 0), Tile::new(TerrainType::Liquid).with_tag("river"));

        assert_eq!(
            terrain.terrain_at(GridPos::new(0, 0)).map(|t| t.terrain),
            Some(TerrainType::Solid)
        );
        let water = terrain.terrain_at(GridPos::new(2, 0)).unwrap();
        assert_eq!(water.terrain, TerrainType::Liquid);
        assert_eq!(water.tags, vec!["river".to_string()]);
    }

    #[test]
    fn no_default_means_void() {
        let terrain = GridTerrain::new().with_tile(GridPos::new(0, 0), Tile::new(TerrainType::Solid));
        assert!(terrain.terrain_at(GridPos::new(0, 0)).is_some());
        assert!(terrain.terrain_at(GridPos::new(1, 0)).is_none());
    }
}
