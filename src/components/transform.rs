//! Grid transform: an integer cell plus a cardinal facing.
//!
//! Every grid-resident entity owns a [`Transform`] holding three [`Pose`]s:
//! the current one, the one it had at the start of the turn (used only by the
//! presentation layer for interpolation) and the starting pose restored on
//! reset.
//!
//! Directions use the mathematical convention: `North = (0, 1)`, `East = (1, 0)`.
//! Turning left maps `(dx, dy)` to `(-dy, dx)`; turning right maps it to
//! `(dy, -dx)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell in `dir`.
    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy) = dir.vector();
        self.translate(dx, dy)
    }

    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Vector from `self` to `other`.
    pub fn delta_to(self, other: GridPos) -> (i32, i32) {
        (other.x - self.x, other.y - self.y)
    }

    pub fn manhattan(self, other: GridPos) -> i32 {
        (other.x - self.x).abs() + (other.y - self.y).abs()
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal facing. Indices run clockwise starting at north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    #[default]
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn vector(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    /// Inverse of [`Direction::vector`]; `None` for anything that is not a
    /// unit axis vector.
    pub fn from_vector(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, 1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, -1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }

    pub fn turn_left(self) -> Self {
        let (dx, dy) = self.vector();
        Self::from_vector(-dy, dx).unwrap_or(self)
    }

    pub fn turn_right(self) -> Self {
        let (dx, dy) = self.vector();
        Self::from_vector(dy, -dx).unwrap_or(self)
    }

    pub fn opposite(self) -> Self {
        self.rotated(2)
    }

    pub fn index(self) -> u8 {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    pub fn from_index(index: u8) -> Self {
        Self::ALL[(index % 4) as usize]
    }

    /// Number of clockwise quarter turns that take `self` to `other`.
    pub fn quarter_turns_to(self, other: Direction) -> u8 {
        (other.index() + 4 - self.index()) % 4
    }

    /// `self` rotated clockwise by `turns` quarter turns.
    pub fn rotated(self, turns: u8) -> Self {
        Self::from_index(self.index() + turns % 4)
    }

    /// Parses `"north"`, `"N"`, `"east"`... case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Some(Direction::North),
            "east" | "e" => Some(Direction::East),
            "south" | "s" => Some(Direction::South),
            "west" | "w" => Some(Direction::West),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A quarter turn in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

impl Turn {
    pub fn apply(self, dir: Direction) -> Direction {
        match self {
            Turn::Left => dir.turn_left(),
            Turn::Right => dir.turn_right(),
        }
    }

    /// Clockwise quarter turns equivalent to this turn.
    pub fn clockwise_turns(self) -> u8 {
        match self {
            Turn::Left => 3,
            Turn::Right => 1,
        }
    }
}

/// Rotates a grid offset clockwise by `turns` quarter turns.
pub fn rotate_offset(offset: (i32, i32), turns: u8) -> (i32, i32) {
    let (mut dx, mut dy) = offset;
    for _ in 0..turns % 4 {
        (dx, dy) = (dy, -dx);
    }
    (dx, dy)
}

/// Position plus facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pose {
    pub pos: GridPos,
    pub facing: Direction,
}

impl Pose {
    pub const fn new(pos: GridPos, facing: Direction) -> Self {
        Self { pos, facing }
    }

    pub fn at(x: i32, y: i32, facing: Direction) -> Self {
        Self::new(GridPos::new(x, y), facing)
    }

    /// Cell directly in front.
    pub fn ahead(&self) -> GridPos {
        self.pos.offset(self.facing)
    }

    pub fn translated(self, dir: Direction) -> Self {
        Self::new(self.pos.offset(dir), self.facing)
    }

    pub fn turned(self, turn: Turn) -> Self {
        Self::new(self.pos, turn.apply(self.facing))
    }
}

/// A rigid attachment of one pose to another.
///
/// Stores the child's offset and facing as they were when the attachment was
/// made, together with the parent's facing at that moment. Resolving against a
/// later parent pose rotates both by the quarter turns the parent has made
/// since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub offset: (i32, i32),
    pub parent_facing: Direction,
    pub child_facing: Direction,
}

impl Attachment {
    pub fn between(parent: Pose, child: Pose) -> Self {
        Self {
            offset: parent.pos.delta_to(child.pos),
            parent_facing: parent.facing,
            child_facing: child.facing,
        }
    }

    pub fn resolve(&self, parent: Pose) -> Pose {
        let turns = self.parent_facing.quarter_turns_to(parent.facing);
        let (dx, dy) = rotate_offset(self.offset, turns);
        Pose::new(parent.pos.translate(dx, dy), self.child_facing.rotated(turns))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    pub current: Pose,
    pub previous: Pose,
    pub start: Pose,
}

impl Transform {
    pub fn new(pose: Pose) -> Self {
        Self {
            current: pose,
            previous: pose,
            start: pose,
        }
    }

    pub fn pos(&self) -> GridPos {
        self.current.pos
    }

    pub fn facing(&self) -> Direction {
        self.current.facing
    }

    pub fn snapshot_previous(&mut self) {
        self.previous = self.current;
    }

    /// Moves the starting pose, and the entity with it.
    pub fn set_start(&mut self, pose: Pose) {
        *self = Self::new(pose);
    }

    pub fn reset_to_start(&mut self) {
        *self = Self::new(self.start);
    }

    /// Interpolated cell-centre position between the previous and current
    /// cells; `progress` is clamped to `[0, 1]`.
    pub fn lerp_position(&self, progress: f32) -> (f32, f32) {
        let t = progress.clamp(0.0, 1.0);
        let (px, py) = (self.previous.pos.x as f32, self.previous.pos.y as f32);
        let (cx, cy) = (self.current.pos.x as f32, self.current.pos.y as f32);
        (px + (cx - px) * t + 0.5, py + (cy - py) * t + 0.5)
    }
}
