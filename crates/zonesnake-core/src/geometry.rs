//! Tile and zone geometry on the unbounded integer plane.

use serde::{Deserialize, Serialize};

use crate::WorldError;

/// Grid-aligned world position in logical units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in logical units.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        self.distance_sq(other).sqrt()
    }

    #[must_use]
    pub fn distance_sq(self, other: Self) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        dx * dx + dy * dy
    }
}

/// Integer coordinate of a zone; zones tile the plane without gaps.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct ZoneKey {
    pub x: i32,
    pub y: i32,
}

impl ZoneKey {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Cardinal movement direction. Screen convention: `Up` decreases `y`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Candidate evaluation order used by the decision engine.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit offset in tiles.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Resolve a tap offset relative to the head into a direction.
    ///
    /// The dominant axis wins; equal magnitudes resolve vertically.
    #[must_use]
    pub fn from_pointer(dx: f32, dy: f32) -> Self {
        if dx.abs() > dy.abs() {
            if dx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if dy > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}

/// `round(v / tile) * tile`, with halves rounding toward positive infinity.
#[must_use]
pub fn snap_to_grid(value: f32, tile_size: i32) -> i32 {
    let tile = tile_size as f32;
    ((value / tile + 0.5).floor() as i32) * tile_size
}

/// Fixed tile and zone dimensions shared by every component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridGeometry {
    tile_size: i32,
    zone_width: i32,
    zone_height: i32,
}

impl GridGeometry {
    /// Zone dimensions must be positive multiples of the tile size so that every
    /// zone edge lies on a tile boundary.
    pub fn new(tile_size: i32, zone_width: i32, zone_height: i32) -> Result<Self, WorldError> {
        if tile_size <= 0 {
            return Err(WorldError::InvalidConfig("tile_size must be positive"));
        }
        if zone_width <= 0 || zone_height <= 0 {
            return Err(WorldError::InvalidConfig("zone dimensions must be positive"));
        }
        if zone_width % tile_size != 0 || zone_height % tile_size != 0 {
            return Err(WorldError::InvalidConfig(
                "zone dimensions must be divisible by tile_size",
            ));
        }
        Ok(Self {
            tile_size,
            zone_width,
            zone_height,
        })
    }

    #[must_use]
    pub const fn tile_size(&self) -> i32 {
        self.tile_size
    }

    #[must_use]
    pub const fn zone_width(&self) -> i32 {
        self.zone_width
    }

    #[must_use]
    pub const fn zone_height(&self) -> i32 {
        self.zone_height
    }

    /// Snap an arbitrary world point onto the tile grid.
    #[must_use]
    pub fn snap(&self, x: f32, y: f32) -> Position {
        Position::new(
            snap_to_grid(x, self.tile_size),
            snap_to_grid(y, self.tile_size),
        )
    }

    #[must_use]
    pub fn zone_of(&self, pos: Position) -> ZoneKey {
        ZoneKey::new(
            pos.x.div_euclid(self.zone_width),
            pos.y.div_euclid(self.zone_height),
        )
    }

    /// Top-left corner of `zone` (inclusive).
    #[must_use]
    pub fn zone_origin(&self, zone: ZoneKey) -> Position {
        Position::new(zone.x * self.zone_width, zone.y * self.zone_height)
    }

    /// Tile columns and rows inside one zone.
    #[must_use]
    pub const fn tiles_per_zone(&self) -> (i32, i32) {
        (
            self.zone_width / self.tile_size,
            self.zone_height / self.tile_size,
        )
    }

    /// Head offset by one tile, snapped, without zone correction.
    #[must_use]
    pub fn neighbor(&self, from: Position, direction: Direction) -> Position {
        let (dx, dy) = direction.delta();
        self.snap(
            (from.x + dx * self.tile_size) as f32,
            (from.y + dy * self.tile_size) as f32,
        )
    }

    /// Next head tile for a move, pulled onto the edge of any newly entered zone.
    ///
    /// Each axis is corrected independently: entering from the low side lands on the
    /// zone's first tile, entering from the high side on its last tile.
    #[must_use]
    pub fn advance(&self, from: Position, direction: Direction) -> Position {
        let naive = self.neighbor(from, direction);
        let previous = self.zone_of(from);
        let entered = self.zone_of(naive);
        let mut next = naive;
        if entered.x != previous.x {
            next.x = if entered.x > previous.x {
                entered.x * self.zone_width
            } else {
                (entered.x + 1) * self.zone_width - self.tile_size
            };
        }
        if entered.y != previous.y {
            next.y = if entered.y > previous.y {
                entered.y * self.zone_height
            } else {
                (entered.y + 1) * self.zone_height - self.tile_size
            };
        }
        next
    }
}
