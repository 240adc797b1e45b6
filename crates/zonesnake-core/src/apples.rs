//! Per-zone apple bookkeeping with a hard per-zone cap.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::{GridGeometry, Position, ZoneKey};

/// Apples grouped by the zone that owns them.
///
/// Zones are created lazily the first time they are touched; queries against
/// unknown zones behave as if the zone were empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppleField {
    geometry: GridGeometry,
    max_per_zone: usize,
    consumption_radius: f32,
    zones: HashMap<ZoneKey, Vec<Position>>,
}

impl AppleField {
    #[must_use]
    pub fn new(geometry: GridGeometry, max_per_zone: usize, consumption_radius: f32) -> Self {
        Self {
            geometry,
            max_per_zone,
            consumption_radius,
            zones: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn max_per_zone(&self) -> usize {
        self.max_per_zone
    }

    /// Apples currently held by `zone`, in storage order.
    #[must_use]
    pub fn apples_in(&self, zone: ZoneKey) -> &[Position] {
        self.zones.get(&zone).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn count_in(&self, zone: ZoneKey) -> usize {
        self.apples_in(zone).len()
    }

    /// Total apples across every zone.
    #[must_use]
    pub fn total(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }

    /// Zones that have been touched so far, with their apples.
    pub fn zones(&self) -> impl Iterator<Item = (ZoneKey, &[Position])> + '_ {
        self.zones.iter().map(|(zone, apples)| (*zone, apples.as_slice()))
    }

    /// Place one apple on a uniformly random tile of `zone` unless it is full.
    pub fn spawn_in_zone(&mut self, zone: ZoneKey, rng: &mut impl Rng) -> Option<Position> {
        let apples = self.zones.entry(zone).or_default();
        if apples.len() >= self.max_per_zone {
            return None;
        }
        let origin = self.geometry.zone_origin(zone);
        let (cols, rows) = self.geometry.tiles_per_zone();
        let tile = self.geometry.tile_size();
        let position = Position::new(
            origin.x + rng.random_range(0..cols) * tile,
            origin.y + rng.random_range(0..rows) * tile,
        );
        apples.push(position);
        Some(position)
    }

    /// Place an apple at a fixed tile, filed under the zone containing it.
    pub fn insert(&mut self, position: Position) -> bool {
        let zone = self.geometry.zone_of(position);
        let apples = self.zones.entry(zone).or_default();
        if apples.len() >= self.max_per_zone {
            return false;
        }
        apples.push(position);
        true
    }

    /// Remove the first apple of `zone` within the consumption radius of `tile`.
    ///
    /// Callers must follow a successful consumption with [`AppleField::spawn_in_zone`]
    /// for the same zone.
    pub fn consume_near(&mut self, tile: Position, zone: ZoneKey) -> Option<Position> {
        let apples = self.zones.get_mut(&zone)?;
        let idx = apples
            .iter()
            .position(|apple| apple.distance(tile) < self.consumption_radius)?;
        Some(apples.remove(idx))
    }

    /// Distance to the closest apple in any zone, `f32::INFINITY` when none exist.
    #[must_use]
    pub fn nearest_distance(&self, point: Position) -> f32 {
        self.zones
            .values()
            .flatten()
            .map(|apple| apple.distance(point))
            .fold(f32::INFINITY, f32::min)
    }

    /// Closest apple in any zone.
    #[must_use]
    pub fn nearest(&self, point: Position) -> Option<Position> {
        self.zones
            .values()
            .flatten()
            .copied()
            .min_by(|a, b| a.distance_sq(point).total_cmp(&b.distance_sq(point)))
    }
}
