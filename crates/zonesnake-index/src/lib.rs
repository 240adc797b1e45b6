//! Spatial indexing abstractions for grid-agent occupancy and neighborhood queries.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Integer bucket coordinate obtained by flooring a world position by the cell size.
pub type Cell = (i32, i32);

/// Errors emitted by spatial index implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Indicates configuration values that cannot be used (e.g., non-positive cell size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// A single indexed point tagged with the dense index of the agent that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub owner: usize,
    pub x: i32,
    pub y: i32,
}

impl Entry {
    #[must_use]
    pub const fn new(owner: usize, x: i32, y: i32) -> Self {
        Self { owner, x, y }
    }
}

/// Common behaviour exposed by neighborhood indices.
pub trait NeighborhoodIndex {
    /// Replace all indexed entries.
    fn rebuild(&mut self, entries: &[Entry]);

    /// Add a single entry.
    fn insert(&mut self, entry: Entry);

    /// Remove one matching entry, returning whether it was present.
    fn remove(&mut self, entry: Entry) -> bool;

    /// Entries located exactly at `(x, y)`.
    fn entries_at(&self, x: i32, y: i32) -> Vec<Entry>;

    /// Entries bucketed into `cell`.
    fn cell_entries(&self, cell: Cell) -> &[Entry];

    /// Visit every entry within the provided squared radius of `(x, y)`.
    fn neighbors_within(
        &self,
        x: i32,
        y: i32,
        radius_sq: f32,
        visitor: &mut dyn FnMut(Entry, OrderedFloat<f32>),
    );
}

/// Uniform grid of rectangular buckets over the unbounded integer plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformGridIndex {
    /// Horizontal extent of one bucket in world units.
    pub cell_width: i32,
    /// Vertical extent of one bucket in world units.
    pub cell_height: i32,
    #[serde(skip)]
    buckets: HashMap<Cell, Vec<Entry>>,
    #[serde(skip)]
    len: usize,
}

impl UniformGridIndex {
    /// Create a new uniform grid with the provided bucket dimensions.
    pub fn new(cell_width: i32, cell_height: i32) -> Result<Self, IndexError> {
        if cell_width <= 0 || cell_height <= 0 {
            return Err(IndexError::InvalidConfig("cell dimensions must be positive"));
        }
        Ok(Self {
            cell_width,
            cell_height,
            buckets: HashMap::new(),
            len: 0,
        })
    }

    /// Bucket holding world position `(x, y)`.
    #[must_use]
    pub fn cell_of(&self, x: i32, y: i32) -> Cell {
        (x.div_euclid(self.cell_width), y.div_euclid(self.cell_height))
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }
}

impl NeighborhoodIndex for UniformGridIndex {
    fn rebuild(&mut self, entries: &[Entry]) {
        self.clear();
        for &entry in entries {
            self.insert(entry);
        }
    }

    fn insert(&mut self, entry: Entry) {
        let cell = self.cell_of(entry.x, entry.y);
        self.buckets.entry(cell).or_default().push(entry);
        self.len += 1;
    }

    fn remove(&mut self, entry: Entry) -> bool {
        let cell = self.cell_of(entry.x, entry.y);
        let Some(bucket) = self.buckets.get_mut(&cell) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|e| *e == entry) else {
            return false;
        };
        bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&cell);
        }
        self.len -= 1;
        true
    }

    fn entries_at(&self, x: i32, y: i32) -> Vec<Entry> {
        self.cell_entries(self.cell_of(x, y))
            .iter()
            .filter(|e| e.x == x && e.y == y)
            .copied()
            .collect()
    }

    fn cell_entries(&self, cell: Cell) -> &[Entry] {
        self.buckets.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    fn neighbors_within(
        &self,
        x: i32,
        y: i32,
        radius_sq: f32,
        visitor: &mut dyn FnMut(Entry, OrderedFloat<f32>),
    ) {
        if radius_sq < 0.0 || radius_sq.is_nan() {
            return;
        }
        let reach = radius_sq.sqrt().ceil() as i32;
        let (min_cx, min_cy) = self.cell_of(x.saturating_sub(reach), y.saturating_sub(reach));
        let (max_cx, max_cy) = self.cell_of(x.saturating_add(reach), y.saturating_add(reach));
        for cy in min_cy..=max_cy {
            for cx in min_cx..=max_cx {
                for entry in self.cell_entries((cx, cy)) {
                    let dx = (entry.x - x) as f32;
                    let dy = (entry.y - y) as f32;
                    let dist_sq = dx * dx + dy * dy;
                    if dist_sq <= radius_sq {
                        visitor(*entry, OrderedFloat(dist_sq));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_within(index: &UniformGridIndex, x: i32, y: i32, radius: f32) -> Vec<usize> {
        let mut owners = Vec::new();
        index.neighbors_within(x, y, radius * radius, &mut |entry, _| owners.push(entry.owner));
        owners.sort_unstable();
        owners
    }

    #[test]
    fn rejects_non_positive_cells() {
        assert_eq!(
            UniformGridIndex::new(0, 16).unwrap_err(),
            IndexError::InvalidConfig("cell dimensions must be positive")
        );
        assert!(UniformGridIndex::new(16, -1).is_err());
    }

    #[test]
    fn negative_positions_floor_into_cells() {
        let index = UniformGridIndex::new(480, 800).expect("index");
        assert_eq!(index.cell_of(0, 0), (0, 0));
        assert_eq!(index.cell_of(-1, -1), (-1, -1));
        assert_eq!(index.cell_of(-480, 799), (-1, 0));
        assert_eq!(index.cell_of(480, 800), (1, 1));
    }

    #[test]
    fn entries_at_matches_exact_position_only() {
        let mut index = UniformGridIndex::new(100, 100).expect("index");
        index.insert(Entry::new(0, 16, 16));
        index.insert(Entry::new(1, 32, 16));
        index.insert(Entry::new(2, 16, 16));
        let owners: Vec<usize> = index.entries_at(16, 16).iter().map(|e| e.owner).collect();
        assert_eq!(owners, vec![0, 2]);
        assert!(index.entries_at(48, 16).is_empty());
    }

    #[test]
    fn remove_drops_only_matching_entry() {
        let mut index = UniformGridIndex::new(16, 16).expect("index");
        index.insert(Entry::new(3, 0, 0));
        index.insert(Entry::new(4, 0, 0));
        assert!(index.remove(Entry::new(3, 0, 0)));
        assert!(!index.remove(Entry::new(3, 0, 0)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries_at(0, 0), vec![Entry::new(4, 0, 0)]);
        assert!(index.remove(Entry::new(4, 0, 0)));
        assert!(index.is_empty());
        assert!(index.cell_entries((0, 0)).is_empty());
    }

    #[test]
    fn neighbors_within_spans_bucket_edges() {
        let mut index = UniformGridIndex::new(32, 32).expect("index");
        index.rebuild(&[
            Entry::new(0, 30, 0),
            Entry::new(1, 34, 0),
            Entry::new(2, -10, 0),
            Entry::new(3, 200, 200),
        ]);
        assert_eq!(collect_within(&index, 32, 0, 48.0), vec![0, 1, 2]);
        assert_eq!(collect_within(&index, 32, 0, 4.0), vec![0, 1]);
    }

    #[test]
    fn neighbors_report_squared_distance() {
        let mut index = UniformGridIndex::new(16, 16).expect("index");
        index.insert(Entry::new(7, 3, 4));
        let mut seen = Vec::new();
        index.neighbors_within(0, 0, 100.0, &mut |entry, dist_sq| {
            seen.push((entry.owner, dist_sq));
        });
        assert_eq!(seen, vec![(7, OrderedFloat(25.0))]);
    }

    #[test]
    fn rebuild_replaces_previous_contents() {
        let mut index = UniformGridIndex::new(16, 16).expect("index");
        index.insert(Entry::new(9, 64, 64));
        index.rebuild(&[Entry::new(1, 0, 0)]);
        assert_eq!(index.len(), 1);
        assert!(index.entries_at(64, 64).is_empty());
    }
}
