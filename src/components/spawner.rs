//! Object spawners.
//!
//! A spawner drops the next object type of its cyclic queue onto its cell
//! every `interval` turns. A blocked cell skips the spawn and restarts the
//! interval without advancing the queue.

use crate::components::transform::{Direction, GridPos};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spawner {
    pub pos: GridPos,
    pub facing: Direction,
    pub types: Vec<String>,
    pub interval: u32,
    counter: u32,
    next: usize,
}

impl Spawner {
    pub fn new(pos: GridPos, types: Vec<String>, interval: u32) -> Self {
        let interval = interval.max(1);
        Self {
            pos,
            facing: Direction::default(),
            types,
            interval,
            counter: interval - 1,
            next: 0,
        }
    }

    pub fn with_facing(mut self, facing: Direction) -> Self {
        self.facing = facing;
        self
    }

    /// Advances the interval counter by one turn. Returns true when a spawn
    /// is due; the counter restarts either way once it is.
    pub fn tick(&mut self) -> bool {
        if self.types.is_empty() {
            return false;
        }
        self.counter += 1;
        if self.counter >= self.interval {
            self.counter = 0;
            return true;
        }
        false
    }

    pub fn next_type(&self) -> Option<&str> {
        self.types.get(self.next).map(String::as_str)
    }

    /// Moves the queue on after a successful spawn.
    pub fn advance_queue(&mut self) {
        if !self.types.is_empty() {
            self.next = (self.next + 1) % self.types.len();
        }
    }

    pub fn reset(&mut self) {
        self.counter = self.interval - 1;
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawner(interval: u32) -> Spawner {
        Spawner::new(
            GridPos::new(0, 0),
            vec!["crate".to_string(), "barrel".to_string()],
            interval,
        )
    }

    #[test]
    fn first_spawn_is_on_first_turn() {
        let mut s = spawner(3);
        assert!(s.tick());
        assert!(!s.tick());
        assert!(!s.tick());
        assert!(s.tick());
    }

    #[test]
    fn queue_is_cyclic() {
        let mut s = spawner(1);
        assert_eq!(s.next_type(), Some("crate"));
        s.advance_queue();
        assert_eq!(s.next_type(), Some("barrel"));
        s.advance_queue();
        assert_eq!(s.next_type(), Some("crate"));
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut s = spawner(2);
        s.tick();
        s.advance_queue();
        s.tick();
        s.reset();
        assert_eq!(s.next_type(), Some("crate"));
        assert!(s.tick());
    }

    #[test]
    fn empty_queue_never_spawns() {
        let mut s = Spawner::new(GridPos::new(0, 0), Vec::new(), 1);
        assert!(!s.tick());
        assert_eq!(s.next_type(), None);
    }
}
