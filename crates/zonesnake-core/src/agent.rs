//! Snake bodies and the arena that owns them.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap, new_key_type};

use crate::geometry::{Direction, Position};

new_key_type! {
    /// Stable handle for agents backed by a generational slot map.
    pub struct AgentId;
}

/// Convenience alias for associating side data with agents.
pub type AgentMap<T> = SecondaryMap<AgentId, T>;

/// Who decides an agent's direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Player,
    Ai,
}

/// Movement timer: accumulates frame time and fires once per elapsed delay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Cadence {
    elapsed_ms: f32,
    delay_ms: f32,
}

impl Cadence {
    #[must_use]
    pub const fn new(delay_ms: f32) -> Self {
        Self {
            elapsed_ms: 0.0,
            delay_ms,
        }
    }

    /// Accumulate `dt_ms`; returns true (and restarts the timer) once the delay elapses.
    pub fn advance(&mut self, dt_ms: f32) -> bool {
        self.elapsed_ms += dt_ms;
        if self.elapsed_ms < self.delay_ms {
            return false;
        }
        self.elapsed_ms = 0.0;
        true
    }
}

/// One snake: an ordered body (head first), a facing and a movement timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snake {
    pub label: String,
    pub kind: AgentKind,
    pub direction: Direction,
    pub cadence: Cadence,
    body: VecDeque<Position>,
    alive: bool,
}

impl Snake {
    /// Build a living snake. `body` must be non-empty, head first.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        kind: AgentKind,
        body: impl IntoIterator<Item = Position>,
        direction: Direction,
        cadence: Cadence,
    ) -> Self {
        let body: VecDeque<Position> = body.into_iter().collect();
        debug_assert!(!body.is_empty(), "snake body must hold a head");
        Self {
            label: label.into(),
            kind,
            direction,
            cadence,
            alive: !body.is_empty(),
            body,
        }
    }

    #[must_use]
    pub fn head(&self) -> Option<Position> {
        self.body.front().copied()
    }

    /// Occupied tiles, head first.
    pub fn body(&self) -> impl ExactSizeIterator<Item = Position> + '_ {
        self.body.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn push_head(&mut self, tile: Position) {
        self.body.push_front(tile);
    }

    pub(crate) fn pop_tail(&mut self) -> Option<Position> {
        self.body.pop_back()
    }

    /// Empty the body and mark dead, returning the tiles that were occupied.
    pub(crate) fn kill(&mut self) -> Vec<Position> {
        self.alive = false;
        self.body.drain(..).collect()
    }
}

/// Dense snake storage with generational handles.
///
/// Agents are never removed: dead snakes stay in place with an empty body so
/// that dense indices remain stable for the lifetime of the world.
#[derive(Debug, Default)]
pub struct AgentArena {
    slots: SlotMap<AgentId, usize>,
    handles: Vec<AgentId>,
    snakes: Vec<Snake>,
}

impl AgentArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of agents, living or dead.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snakes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snakes.is_empty()
    }

    /// Iterate over `(handle, snake)` pairs in population order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Snake)> + '_ {
        self.handles.iter().copied().zip(self.snakes.iter())
    }

    /// Returns the dense index for `id`, if present.
    #[must_use]
    pub fn index_of(&self, id: AgentId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    /// Handle stored at dense index `index`.
    #[must_use]
    pub fn handle_at(&self, index: usize) -> Option<AgentId> {
        self.handles.get(index).copied()
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Snake> {
        self.index_of(id).and_then(|idx| self.snakes.get(idx))
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Snake> {
        let idx = self.index_of(id)?;
        self.snakes.get_mut(idx)
    }

    #[must_use]
    pub fn snake_at(&self, index: usize) -> Option<&Snake> {
        self.snakes.get(index)
    }

    pub(crate) fn snake_at_mut(&mut self, index: usize) -> Option<&mut Snake> {
        self.snakes.get_mut(index)
    }

    /// Insert a new agent and return its handle.
    pub fn insert(&mut self, snake: Snake) -> AgentId {
        let index = self.snakes.len();
        self.snakes.push(snake);
        let id = self.slots.insert(index);
        self.handles.push(id);
        id
    }

    /// Living agents in population order.
    pub fn alive(&self) -> impl Iterator<Item = (AgentId, &Snake)> + '_ {
        self.iter().filter(|(_, snake)| snake.is_alive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snake(label: &str, x: i32) -> Snake {
        Snake::new(
            label,
            AgentKind::Ai,
            [Position::new(x, 0), Position::new(x - 16, 0)],
            Direction::Right,
            Cadence::new(150.0),
        )
    }

    #[test]
    fn insert_allocates_unique_handles() {
        let mut arena = AgentArena::new();
        let a = arena.insert(snake("AI-0", 32));
        let b = arena.insert(snake("AI-1", 64));
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.index_of(b), Some(1));
        assert_eq!(arena.handle_at(0), Some(a));
        assert_eq!(arena.get(b).map(|s| s.label.as_str()), Some("AI-1"));
    }

    #[test]
    fn cadence_fires_once_per_delay_and_restarts() {
        let mut cadence = Cadence::new(150.0);
        assert!(!cadence.advance(100.0));
        assert!(cadence.advance(60.0));
        assert!(!cadence.advance(149.0));
        assert!(cadence.advance(1.0));
    }

    #[test]
    fn kill_empties_body_and_keeps_slot() {
        let mut arena = AgentArena::new();
        let id = arena.insert(snake("AI-0", 32));
        let tiles = arena.get_mut(id).expect("snake").kill();
        assert_eq!(tiles, vec![Position::new(32, 0), Position::new(16, 0)]);
        let dead = arena.get(id).expect("still stored");
        assert!(!dead.is_alive());
        assert!(dead.is_empty());
        assert!(dead.head().is_none());
        assert_eq!(arena.alive().count(), 0);
    }

    #[test]
    fn head_and_body_follow_pushes() {
        let mut s = snake("AI-0", 32);
        s.push_head(Position::new(48, 0));
        assert_eq!(s.head(), Some(Position::new(48, 0)));
        assert_eq!(s.pop_tail(), Some(Position::new(16, 0)));
        let body: Vec<Position> = s.body().collect();
        assert_eq!(body, vec![Position::new(48, 0), Position::new(32, 0)]);
    }
}
