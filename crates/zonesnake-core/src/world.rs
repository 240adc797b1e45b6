//! The simulation facade: population bootstrap, player input and the per-frame
//! pipeline that advances every agent.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use rand::Rng;
use rand::rngs::SmallRng;
use tracing::{debug, info, trace};

use crate::agent::{AgentArena, AgentId, AgentKind, AgentMap, Cadence, Snake};
use crate::apples::AppleField;
use crate::brain::{self, BrainTuning, ForagerState, Surroundings};
use crate::collision::Occupancy;
use crate::geometry::{Direction, GridGeometry, Position, ZoneKey};
use crate::{
    AppleEaten, AppleSpawned, Frame, FrameEvents, FrameSummary, WorldError, ZoneEntered,
    ZoneSnakeConfig,
};

/// Redraws allowed when a random AI spawn tile is already taken.
const SPAWN_ATTEMPTS: usize = 8;

/// Label given to the player snake.
pub const PLAYER_LABEL: &str = "player";

/// Aggregate simulation state.
pub struct World {
    config: ZoneSnakeConfig,
    geometry: GridGeometry,
    tuning: BrainTuning,
    frame: Frame,
    rng: SmallRng,
    agents: AgentArena,
    foragers: AgentMap<ForagerState>,
    apples: AppleField,
    occupancy: Occupancy,
    player: Option<AgentId>,
    player_dead: bool,
    winner: Option<AgentId>,
    pending: FrameEvents,
    history: VecDeque<FrameSummary>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("frame", &self.frame)
            .field("agent_count", &self.agents.len())
            .field("live_count", &self.live_count())
            .field("apples", &self.apples.total())
            .field("player_dead", &self.player_dead)
            .finish()
    }
}

impl World {
    /// Instantiate an empty world using the supplied configuration.
    pub fn new(config: ZoneSnakeConfig) -> Result<Self, WorldError> {
        let geometry = config.validate()?;
        let occupancy = Occupancy::new(&geometry)?;
        let apples = AppleField::new(
            geometry,
            config.max_apples_per_zone,
            config.apple_consumption_radius,
        );
        let tuning = config.brain_tuning();
        let rng = config.seeded_rng();
        let history_capacity = config.history_capacity;
        info!(
            tile_size = geometry.tile_size(),
            zone_width = geometry.zone_width(),
            zone_height = geometry.zone_height(),
            seed = ?config.rng_seed,
            "created zonesnake world"
        );
        Ok(Self {
            config,
            geometry,
            tuning,
            frame: Frame::zero(),
            rng,
            agents: AgentArena::new(),
            foragers: AgentMap::new(),
            apples,
            occupancy,
            player: None,
            player_dead: false,
            winner: None,
            pending: FrameEvents::default(),
            history: VecDeque::with_capacity(history_capacity),
        })
    }

    /// Build a world and spawn the configured population.
    pub fn populated(config: ZoneSnakeConfig) -> Result<Self, WorldError> {
        let mut world = Self::new(config)?;
        world.populate()?;
        Ok(world)
    }

    /// Spawn the AI population across random zones, then the player, seeding an
    /// apple in every zone that receives an agent.
    pub fn populate(&mut self) -> Result<(), WorldError> {
        let radius = self.config.ai_spawn_zone_radius;
        let (cols, rows) = self.geometry.tiles_per_zone();
        let tile = self.geometry.tile_size();
        for n in 0..self.config.ai_population {
            let zone = ZoneKey::new(
                self.rng.random_range(-radius..=radius),
                self.rng.random_range(-radius..=radius),
            );
            let origin = self.geometry.zone_origin(zone);
            let mut head = origin;
            for _ in 0..SPAWN_ATTEMPTS {
                head = Position::new(
                    origin.x + self.rng.random_range(0..cols) * tile,
                    origin.y + self.rng.random_range(0..rows) * tile,
                );
                if !self.occupancy.is_occupied(head, usize::MAX, None) {
                    break;
                }
            }
            let direction = Direction::ALL[self.rng.random_range(0..Direction::ALL.len())];
            self.spawn_ai(format!("AI-{n}"), [head], direction)?;
            self.spawn_apple(zone);
        }

        let spawn = self.config.player_spawn;
        let head = self.geometry.snap(spawn.x as f32, spawn.y as f32);
        self.spawn_player([head], Direction::Right)?;
        self.spawn_apple(self.geometry.zone_of(head));
        debug!(
            agents = self.agents.len(),
            apples = self.apples.total(),
            "populated world"
        );
        Ok(())
    }

    /// Spawn the player snake. `body` is head first and snapped to the grid.
    ///
    /// Direct spawns do not seed apples; [`World::populate`] does.
    pub fn spawn_player(
        &mut self,
        body: impl IntoIterator<Item = Position>,
        direction: Direction,
    ) -> Result<AgentId, WorldError> {
        if self.player.is_some() {
            return Err(WorldError::PlayerExists);
        }
        let id = self.spawn(
            PLAYER_LABEL.to_owned(),
            AgentKind::Player,
            body,
            direction,
            self.config.player_move_delay_ms,
        )?;
        self.player = Some(id);
        self.player_dead = false;
        Ok(id)
    }

    /// Spawn an AI snake. `body` is head first.
    pub fn spawn_ai(
        &mut self,
        label: impl Into<String>,
        body: impl IntoIterator<Item = Position>,
        direction: Direction,
    ) -> Result<AgentId, WorldError> {
        let id = self.spawn(
            label.into(),
            AgentKind::Ai,
            body,
            direction,
            self.config.ai_move_delay_ms,
        )?;
        self.foragers.insert(id, ForagerState::new());
        Ok(id)
    }

    fn spawn(
        &mut self,
        label: String,
        kind: AgentKind,
        body: impl IntoIterator<Item = Position>,
        direction: Direction,
        delay_ms: f32,
    ) -> Result<AgentId, WorldError> {
        let body: Vec<Position> = body
            .into_iter()
            .map(|p| self.geometry.snap(p.x as f32, p.y as f32))
            .collect();
        if body.is_empty() {
            return Err(WorldError::EmptyBody);
        }
        let tile = self.geometry.tile_size();
        let contiguous = body
            .windows(2)
            .all(|pair| (pair[0].x - pair[1].x).abs() + (pair[0].y - pair[1].y).abs() == tile);
        let distinct = body.iter().collect::<HashSet<_>>().len() == body.len();
        if !contiguous || !distinct {
            return Err(WorldError::MalformedBody);
        }
        let owner = self.agents.len();
        self.occupancy.claim_body(owner, kind, &body);
        Ok(self.agents.insert(Snake::new(
            label,
            kind,
            body,
            direction,
            Cadence::new(delay_ms),
        )))
    }

    /// Request a new player direction. U-turns and input after death are ignored.
    pub fn steer_player(&mut self, direction: Direction) -> bool {
        let Some(snake) = self.player.and_then(|id| self.agents.get_mut(id)) else {
            return false;
        };
        if !snake.is_alive() || direction == snake.direction.opposite() {
            return false;
        }
        snake.direction = direction;
        true
    }

    /// Resolve a tap at world coordinates relative to the player's head and steer.
    pub fn tap_player(&mut self, x: f32, y: f32) -> bool {
        let Some(head) = self.player_head() else {
            return false;
        };
        let direction = Direction::from_pointer(x - head.x as f32, y - head.y as f32);
        self.steer_player(direction)
    }

    /// Execute one frame, advancing every agent whose cadence expires.
    pub fn step(&mut self, dt_ms: f32) -> FrameEvents {
        let next_frame = self.frame.next();
        let dt_ms = dt_ms.max(0.0);

        self.stage_ai(dt_ms);
        self.stage_player(dt_ms);
        self.stage_winner();

        self.frame = next_frame;
        let mut events = std::mem::take(&mut self.pending);
        events.frame = next_frame;
        self.stage_history(&events);
        events
    }

    fn stage_ai(&mut self, dt_ms: f32) {
        for idx in 0..self.agents.len() {
            let Some(id) = self.agents.handle_at(idx) else {
                continue;
            };
            let Some(snake) = self.agents.snake_at_mut(idx) else {
                continue;
            };
            if snake.kind != AgentKind::Ai || !snake.is_alive() {
                continue;
            }
            let due = snake.cadence.advance(dt_ms);
            let Some(head) = snake.head() else {
                continue;
            };
            let Some(state) = self.foragers.get_mut(id) else {
                continue;
            };
            state.tick_cooldown(dt_ms);
            if !due {
                continue;
            }

            let player_head = self
                .player
                .and_then(|player| self.agents.get(player))
                .and_then(Snake::head);
            let view = Surroundings {
                geometry: &self.geometry,
                apples: &self.apples,
                occupancy: &self.occupancy,
                player_head,
            };
            let Some(direction) =
                brain::decide(idx, head, state, &self.tuning, &view, &mut self.rng)
            else {
                trace!(agent = idx, "no legal move; holding");
                continue;
            };
            if let Some(snake) = self.agents.snake_at_mut(idx) {
                snake.direction = direction;
            }
            self.move_agent(idx);
        }
    }

    fn stage_player(&mut self, dt_ms: f32) {
        let Some(idx) = self.player.and_then(|id| self.agents.index_of(id)) else {
            return;
        };
        let Some(snake) = self.agents.snake_at_mut(idx) else {
            return;
        };
        if snake.is_alive() && snake.cadence.advance(dt_ms) {
            self.move_agent(idx);
        }
    }

    fn stage_winner(&mut self) {
        if self.winner.is_some() || self.agents.len() < 2 {
            return;
        }
        let mut alive = self.agents.alive();
        if let (Some((id, snake)), None) = (alive.next(), alive.next()) {
            debug!(agent = %snake.label, frame = self.frame.next().0, "last snake standing");
            self.winner = Some(id);
            self.pending.winner = Some(id);
        }
    }

    fn stage_history(&mut self, events: &FrameEvents) {
        if self.config.history_capacity == 0 {
            return;
        }
        let summary = FrameSummary {
            frame: events.frame,
            alive: self.live_count(),
            apples: self.apples.total(),
            deaths: events.deaths.len(),
        };
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
    }

    /// Move the agent at `idx` one tile in its current direction: zone
    /// correction, collision, head insertion, feeding and zone entry.
    fn move_agent(&mut self, idx: usize) {
        let Some(snake) = self.agents.snake_at(idx) else {
            return;
        };
        let Some(head) = snake.head() else {
            return;
        };
        let kind = snake.kind;
        let target = self.geometry.advance(head, snake.direction);
        let previous_zone = self.geometry.zone_of(head);
        let zone = self.geometry.zone_of(target);

        if self.occupancy.is_occupied(target, idx, Some(head)) {
            self.kill(idx);
            return;
        }

        let Some(id) = self.agents.handle_at(idx) else {
            return;
        };
        let Some(snake) = self.agents.snake_at_mut(idx) else {
            return;
        };
        snake.push_head(target);
        self.occupancy.advance_head(idx, kind, head, target);
        if let Some(state) = self.foragers.get_mut(id) {
            state.mark_visited(zone);
        }

        if let Some(position) = self.apples.consume_near(target, zone) {
            self.pending.apples_eaten.push(AppleEaten {
                agent: id,
                zone,
                position,
            });
            self.spawn_apple(zone);
        } else if let Some(tail) = snake.pop_tail() {
            self.occupancy.release_tail(idx, tail);
        }

        if zone != previous_zone {
            debug!(agent = idx, zone_x = zone.x, zone_y = zone.y, "entered zone");
            self.pending.zone_entries.push(ZoneEntered { agent: id, zone });
            self.spawn_apple(zone);
        }
    }

    fn spawn_apple(&mut self, zone: ZoneKey) {
        if let Some(position) = self.apples.spawn_in_zone(zone, &mut self.rng) {
            self.pending.apples_spawned.push(AppleSpawned { zone, position });
        }
    }

    fn kill(&mut self, idx: usize) {
        let Some(id) = self.agents.handle_at(idx) else {
            return;
        };
        let Some(snake) = self.agents.snake_at_mut(idx) else {
            return;
        };
        let kind = snake.kind;
        let body = snake.kill();
        self.occupancy.release_body(idx, kind, &body);
        debug!(agent = %snake.label, length = body.len(), "snake died");
        self.pending.deaths.push(id);
        if kind == AgentKind::Player {
            self.player_dead = true;
            self.pending.player_died = true;
        }
    }

    /// Place an apple on a specific tile (snapped), subject to the zone cap.
    pub fn place_apple(&mut self, position: Position) -> bool {
        let position = self.geometry.snap(position.x as f32, position.y as f32);
        if !self.apples.insert(position) {
            return false;
        }
        let zone = self.geometry.zone_of(position);
        self.pending.apples_spawned.push(AppleSpawned { zone, position });
        true
    }

    #[must_use]
    pub const fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Frames processed so far.
    #[must_use]
    pub const fn frame(&self) -> Frame {
        self.frame
    }

    #[must_use]
    pub fn agents(&self) -> &AgentArena {
        &self.agents
    }

    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Snake> {
        self.agents.get(id)
    }

    /// Decision-engine state for an AI agent.
    #[must_use]
    pub fn forager(&self, id: AgentId) -> Option<&ForagerState> {
        self.foragers.get(id)
    }

    #[must_use]
    pub fn apples(&self) -> &AppleField {
        &self.apples
    }

    #[must_use]
    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    #[must_use]
    pub const fn player(&self) -> Option<AgentId> {
        self.player
    }

    #[must_use]
    pub fn player_head(&self) -> Option<Position> {
        self.player
            .and_then(|id| self.agents.get(id))
            .and_then(Snake::head)
    }

    #[must_use]
    pub const fn is_player_dead(&self) -> bool {
        self.player_dead
    }

    /// Living agents, player included.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.agents.alive().count()
    }

    /// First living AI in population order, once the player is dead.
    #[must_use]
    pub fn spectator_target(&self) -> Option<AgentId> {
        if !self.player_dead {
            return None;
        }
        self.agents
            .alive()
            .find(|(_, snake)| snake.kind == AgentKind::Ai)
            .map(|(id, _)| id)
    }

    /// The last snake standing, if one has been declared.
    #[must_use]
    pub const fn winner(&self) -> Option<AgentId> {
        self.winner
    }

    /// True when every agent is dead.
    #[must_use]
    pub fn is_extinct(&self) -> bool {
        !self.agents.is_empty() && self.live_count() == 0
    }

    /// Iterate over retained frame summaries.
    pub fn history(&self) -> impl Iterator<Item = &FrameSummary> {
        self.history.iter()
    }
}
