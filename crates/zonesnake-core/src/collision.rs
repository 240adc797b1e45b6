//! Occupancy oracle shared by move legality and AI candidate filtering.

use zonesnake_index::{Entry, IndexError, NeighborhoodIndex, UniformGridIndex};

use crate::agent::{AgentArena, AgentKind};
use crate::geometry::{GridGeometry, Position, ZoneKey};

/// Spatial view of the population.
///
/// `tiles` buckets every body segment of every living agent by tile; `heads`
/// buckets the head of every living AI agent by zone. Both are kept current as
/// agents move so that agents processed later in a frame observe earlier moves.
#[derive(Debug, Clone)]
pub struct Occupancy {
    tiles: UniformGridIndex,
    heads: UniformGridIndex,
}

impl Occupancy {
    pub fn new(geometry: &GridGeometry) -> Result<Self, IndexError> {
        Ok(Self {
            tiles: UniformGridIndex::new(geometry.tile_size(), geometry.tile_size())?,
            heads: UniformGridIndex::new(geometry.zone_width(), geometry.zone_height())?,
        })
    }

    /// Re-index every living agent in `arena`.
    pub fn rebuild(&mut self, arena: &AgentArena) {
        let mut tiles = Vec::new();
        let mut heads = Vec::new();
        for (idx, (_, snake)) in arena.iter().enumerate() {
            if !snake.is_alive() {
                continue;
            }
            tiles.extend(snake.body().map(|p| Entry::new(idx, p.x, p.y)));
            if snake.kind == AgentKind::Ai {
                if let Some(head) = snake.head() {
                    heads.push(Entry::new(idx, head.x, head.y));
                }
            }
        }
        self.tiles.rebuild(&tiles);
        self.heads.rebuild(&heads);
    }

    /// True when `tile` holds any segment of another agent, or any non-head
    /// segment of `mover` (whose head currently sits at `mover_head`).
    #[must_use]
    pub fn is_occupied(&self, tile: Position, mover: usize, mover_head: Option<Position>) -> bool {
        self.tiles
            .entries_at(tile.x, tile.y)
            .iter()
            .any(|entry| entry.owner != mover || mover_head != Some(tile))
    }

    /// Living AI agents other than `excluding` whose head lies in `zone`.
    #[must_use]
    pub fn heads_in_zone(&self, zone: ZoneKey, excluding: usize) -> usize {
        self.heads
            .cell_entries((zone.x, zone.y))
            .iter()
            .filter(|entry| entry.owner != excluding)
            .count()
    }

    /// Living AI agents other than `excluding` whose head is strictly closer than `radius`.
    #[must_use]
    pub fn heads_near(&self, point: Position, radius: f32, excluding: usize) -> usize {
        let radius_sq = radius * radius;
        let mut count = 0;
        self.heads
            .neighbors_within(point.x, point.y, radius_sq, &mut |entry, dist_sq| {
                if entry.owner != excluding && dist_sq.into_inner() < radius_sq {
                    count += 1;
                }
            });
        count
    }

    /// Index a newly spawned agent. `body` is head first.
    pub(crate) fn claim_body(&mut self, owner: usize, kind: AgentKind, body: &[Position]) {
        for tile in body {
            self.tiles.insert(Entry::new(owner, tile.x, tile.y));
        }
        if kind == AgentKind::Ai {
            if let Some(head) = body.first() {
                self.heads.insert(Entry::new(owner, head.x, head.y));
            }
        }
    }

    /// Record a head advancing from `from` to `to`.
    pub(crate) fn advance_head(
        &mut self,
        owner: usize,
        kind: AgentKind,
        from: Position,
        to: Position,
    ) {
        self.tiles.insert(Entry::new(owner, to.x, to.y));
        if kind == AgentKind::Ai {
            self.heads.remove(Entry::new(owner, from.x, from.y));
            self.heads.insert(Entry::new(owner, to.x, to.y));
        }
    }

    pub(crate) fn release_tail(&mut self, owner: usize, tail: Position) {
        self.tiles.remove(Entry::new(owner, tail.x, tail.y));
    }

    /// Forget every tile of a dead agent. `body` is head first.
    pub(crate) fn release_body(&mut self, owner: usize, kind: AgentKind, body: &[Position]) {
        for tile in body {
            self.tiles.remove(Entry::new(owner, tile.x, tile.y));
        }
        if kind == AgentKind::Ai {
            if let Some(head) = body.first() {
                self.heads.remove(Entry::new(owner, head.x, head.y));
            }
        }
    }

    /// Number of indexed body segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.tiles.len()
    }
}
