//! Core types for the zonesnake simulation: a player snake and a population of
//! autonomous snakes moving on an unbounded tile grid partitioned into zones,
//! competing for apples that each zone keeps in bounded supply.
//!
//! The crate is pure computation. Callers feed elapsed frame time to
//! [`World::step`] and read back [`FrameEvents`]; nothing here renders, loads
//! assets or performs IO.

pub mod agent;
pub mod apples;
pub mod brain;
pub mod collision;
pub mod geometry;
pub mod world;

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zonesnake_index::IndexError;

pub use agent::{AgentArena, AgentId, AgentKind, AgentMap, Cadence, Snake};
pub use apples::AppleField;
pub use brain::{BrainTuning, Candidate, ForageMode, ForagerState, Surroundings};
pub use collision::Occupancy;
pub use geometry::{Direction, GridGeometry, Position, ZoneKey, snap_to_grid};
pub use world::World;

/// Errors that can occur when constructing or seeding a world.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Spatial index construction failed.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Agents need at least a head tile.
    #[error("agent body must contain at least one tile")]
    EmptyBody,
    /// Body segments must be distinct and each one tile from the next.
    #[error("agent body segments must be distinct and contiguous")]
    MalformedBody,
    /// Only one player snake may exist.
    #[error("a player snake already exists")]
    PlayerExists,
}

/// Static configuration for a zonesnake world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoneSnakeConfig {
    /// Edge length of one tile in logical units.
    pub tile_size: i32,
    /// Width of one zone (must be a multiple of `tile_size`).
    pub zone_width: i32,
    /// Height of one zone (must be a multiple of `tile_size`).
    pub zone_height: i32,
    /// Milliseconds between player moves.
    pub player_move_delay_ms: f32,
    /// Milliseconds between AI moves.
    pub ai_move_delay_ms: f32,
    /// Maximum apples held by a zone at once.
    pub max_apples_per_zone: usize,
    /// A head strictly closer than this to an apple eats it.
    pub apple_consumption_radius: f32,
    /// Non-improving decisions tolerated before an AI starts exploring.
    pub stuck_threshold: u32,
    /// How long exploring lasts once triggered.
    pub explore_cooldown_ms: f32,
    /// A zone is crowded when more than this many other AI heads are in it.
    pub crowding_threshold: usize,
    /// Score removed from candidates in crowded zones.
    pub crowding_penalty: f32,
    /// Score per apple in the candidate's zone.
    pub zone_apple_weight: f32,
    /// Score for candidates in zones this agent has never been in.
    pub new_zone_bonus: f32,
    /// Numerator of the `weight / distance` food-seeking term.
    pub food_seek_weight: f32,
    /// Upper bound (inclusive) of the random score added while exploring.
    pub explore_jitter_max: u32,
    /// Trap bonus is evaluated with probability `1 / trap_check_one_in`.
    pub trap_check_one_in: u32,
    /// Heads strictly closer than this to a candidate count toward the trap bonus.
    pub trap_radius: f32,
    /// Trap bonus when the player's head is near the candidate.
    pub trap_player_bonus: f32,
    /// Trap bonus per nearby rival AI head.
    pub trap_rival_bonus: f32,
    /// Number of AI agents spawned by [`World::populate`].
    pub ai_population: usize,
    /// AI agents spawn in zones within this many zones of the origin on each axis.
    pub ai_spawn_zone_radius: i32,
    /// Player head at start (snapped to the grid).
    pub player_spawn: Position,
    /// Optional RNG seed for reproducible worlds.
    pub rng_seed: Option<u64>,
    /// Maximum number of recent frame summaries retained in-memory.
    pub history_capacity: usize,
}

impl Default for ZoneSnakeConfig {
    fn default() -> Self {
        Self {
            tile_size: 16,
            zone_width: 480,
            zone_height: 800,
            player_move_delay_ms: 150.0,
            ai_move_delay_ms: 150.0,
            max_apples_per_zone: 4,
            apple_consumption_radius: 24.0,
            stuck_threshold: 5,
            explore_cooldown_ms: 3_000.0,
            crowding_threshold: 3,
            crowding_penalty: 20.0,
            zone_apple_weight: 10.0,
            new_zone_bonus: 5.0,
            food_seek_weight: 1_000.0,
            explore_jitter_max: 10,
            trap_check_one_in: 21,
            trap_radius: 48.0,
            trap_player_bonus: 20.0,
            trap_rival_bonus: 10.0,
            ai_population: 99,
            ai_spawn_zone_radius: 6,
            player_spawn: Position::new(240, 400),
            rng_seed: None,
            history_capacity: 256,
        }
    }
}

impl ZoneSnakeConfig {
    /// Validates the configuration, returning the derived grid geometry.
    pub fn validate(&self) -> Result<GridGeometry, WorldError> {
        let geometry = GridGeometry::new(self.tile_size, self.zone_width, self.zone_height)?;
        if !(self.player_move_delay_ms > 0.0 && self.player_move_delay_ms.is_finite())
            || !(self.ai_move_delay_ms > 0.0 && self.ai_move_delay_ms.is_finite())
        {
            return Err(WorldError::InvalidConfig(
                "move delays must be positive and finite",
            ));
        }
        if self.max_apples_per_zone == 0 {
            return Err(WorldError::InvalidConfig(
                "max_apples_per_zone must be non-zero",
            ));
        }
        if !(self.apple_consumption_radius > 0.0) || !(self.trap_radius > 0.0) {
            return Err(WorldError::InvalidConfig(
                "consumption and trap radii must be positive",
            ));
        }
        if !(self.explore_cooldown_ms >= 0.0) {
            return Err(WorldError::InvalidConfig(
                "explore_cooldown_ms must be non-negative",
            ));
        }
        if self.trap_check_one_in == 0 {
            return Err(WorldError::InvalidConfig(
                "trap_check_one_in must be at least 1",
            ));
        }
        if ![
            self.crowding_penalty,
            self.zone_apple_weight,
            self.new_zone_bonus,
            self.food_seek_weight,
            self.trap_player_bonus,
            self.trap_rival_bonus,
        ]
        .iter()
        .all(|w| w.is_finite())
        {
            return Err(WorldError::InvalidConfig("score weights must be finite"));
        }
        if self.ai_spawn_zone_radius < 0 {
            return Err(WorldError::InvalidConfig(
                "ai_spawn_zone_radius must be non-negative",
            ));
        }
        Ok(geometry)
    }

    /// Scoring and state-machine parameters for the decision engine.
    #[must_use]
    pub fn brain_tuning(&self) -> BrainTuning {
        BrainTuning {
            stuck_threshold: self.stuck_threshold,
            explore_cooldown_ms: self.explore_cooldown_ms,
            crowding_threshold: self.crowding_threshold,
            crowding_penalty: self.crowding_penalty,
            zone_apple_weight: self.zone_apple_weight,
            new_zone_bonus: self.new_zone_bonus,
            food_seek_weight: self.food_seek_weight,
            explore_jitter_max: self.explore_jitter_max,
            trap_check_one_in: self.trap_check_one_in,
            trap_radius: self.trap_radius,
            trap_player_bonus: self.trap_player_bonus,
            trap_rival_bonus: self.trap_rival_bonus,
        }
    }

    /// Returns the configured RNG seed, generating one from entropy if absent.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// Frames processed since the world was created.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Frame(pub u64);

impl Frame {
    /// Returns the next sequential frame.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// An agent's head moved into a different zone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneEntered {
    pub agent: AgentId,
    pub zone: ZoneKey,
}

/// An apple appeared in a zone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppleSpawned {
    pub zone: ZoneKey,
    pub position: Position,
}

/// An agent ate an apple.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppleEaten {
    pub agent: AgentId,
    pub zone: ZoneKey,
    pub position: Position,
}

/// Events emitted after processing one frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FrameEvents {
    pub frame: Frame,
    pub zone_entries: Vec<ZoneEntered>,
    pub deaths: Vec<AgentId>,
    pub player_died: bool,
    pub apples_spawned: Vec<AppleSpawned>,
    pub apples_eaten: Vec<AppleEaten>,
    pub winner: Option<AgentId>,
}

/// Summary retained in the world's bounded history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameSummary {
    pub frame: Frame,
    pub alive: usize,
    pub apples: usize,
    pub deaths: usize,
}
