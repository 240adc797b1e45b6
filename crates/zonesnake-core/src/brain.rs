//! Heuristic direction choice for autonomous snakes.
//!
//! Each decision scores the four neighbouring tiles from zone apple counts,
//! crowding, novelty and either a food-seeking pull (foraging) or random jitter
//! (exploring). An agent whose nearest-apple distance keeps failing to improve
//! switches to exploring for a fixed cooldown.

use std::collections::HashSet;

use ordered_float::OrderedFloat;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::apples::AppleField;
use crate::collision::Occupancy;
use crate::geometry::{Direction, GridGeometry, Position, ZoneKey};

/// Scoring weights and state-machine thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BrainTuning {
    pub stuck_threshold: u32,
    pub explore_cooldown_ms: f32,
    pub crowding_threshold: usize,
    pub crowding_penalty: f32,
    pub zone_apple_weight: f32,
    pub new_zone_bonus: f32,
    pub food_seek_weight: f32,
    pub explore_jitter_max: u32,
    pub trap_check_one_in: u32,
    pub trap_radius: f32,
    pub trap_player_bonus: f32,
    pub trap_rival_bonus: f32,
}

/// Behaviour state of an AI agent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ForageMode {
    #[default]
    Foraging,
    Exploring,
}

/// Per-agent memory carried between decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForagerState {
    visited: HashSet<ZoneKey>,
    stuck: u32,
    mode: ForageMode,
    cooldown_ms: f32,
    last_distance: Option<f32>,
}

impl ForagerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn mode(&self) -> ForageMode {
        self.mode
    }

    #[must_use]
    pub const fn stuck(&self) -> u32 {
        self.stuck
    }

    #[must_use]
    pub const fn cooldown_ms(&self) -> f32 {
        self.cooldown_ms
    }

    #[must_use]
    pub fn has_visited(&self, zone: ZoneKey) -> bool {
        self.visited.contains(&zone)
    }

    pub(crate) fn mark_visited(&mut self, zone: ZoneKey) {
        self.visited.insert(zone);
    }

    /// Count down the exploration cooldown by one frame.
    pub fn tick_cooldown(&mut self, dt_ms: f32) {
        self.cooldown_ms -= dt_ms;
    }

    /// Record the current nearest-apple distance and run the mode transitions.
    ///
    /// Only a strictly smaller distance counts as progress. Exceeding the stuck
    /// threshold enters exploring and arms the cooldown; an expired cooldown
    /// returns to foraging.
    pub fn observe(&mut self, distance: f32, tuning: &BrainTuning) -> ForageMode {
        let improving = self.last_distance.is_none_or(|last| distance < last);
        self.last_distance = Some(distance);
        if improving {
            self.stuck = 0;
        } else {
            self.stuck += 1;
        }

        if self.stuck > tuning.stuck_threshold {
            self.mode = ForageMode::Exploring;
            self.stuck = 0;
            self.cooldown_ms = tuning.explore_cooldown_ms;
            tracing::trace!(cooldown_ms = self.cooldown_ms, "forager started exploring");
        }

        if self.cooldown_ms <= 0.0 && self.mode == ForageMode::Exploring {
            self.mode = ForageMode::Foraging;
            tracing::trace!("forager resumed foraging");
        }
        self.mode
    }
}

/// Read-only world view consulted while scoring.
#[derive(Debug, Clone, Copy)]
pub struct Surroundings<'a> {
    pub geometry: &'a GridGeometry,
    pub apples: &'a AppleField,
    pub occupancy: &'a Occupancy,
    pub player_head: Option<Position>,
}

/// A legal candidate move and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub direction: Direction,
    pub tile: Position,
    pub score: f32,
}

/// Score every legal neighbour of `head` for the agent at dense index `me`.
pub fn score_candidates(
    me: usize,
    head: Position,
    state: &ForagerState,
    tuning: &BrainTuning,
    view: &Surroundings<'_>,
    rng: &mut impl Rng,
) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(Direction::ALL.len());
    for direction in Direction::ALL {
        let tile = view.geometry.neighbor(head, direction);
        if view.occupancy.is_occupied(tile, me, Some(head)) {
            continue;
        }
        let zone = view.geometry.zone_of(tile);
        let mut score = tuning.zone_apple_weight * view.apples.count_in(zone) as f32;
        if view.occupancy.heads_in_zone(zone, me) > tuning.crowding_threshold {
            score -= tuning.crowding_penalty;
        }
        if !state.has_visited(zone) {
            score += tuning.new_zone_bonus;
        }
        match state.mode() {
            ForageMode::Exploring => {
                score += rng.random_range(0..=tuning.explore_jitter_max) as f32;
            }
            ForageMode::Foraging => {
                // A candidate sitting on an apple gets no pull from this term.
                let distance = view.apples.nearest_distance(tile);
                if distance > 0.0 {
                    score += tuning.food_seek_weight / distance;
                }
                if rng.random_range(0..tuning.trap_check_one_in) == 0 {
                    score += trap_bonus(me, tile, tuning, view);
                }
            }
        }
        candidates.push(Candidate {
            direction,
            tile,
            score,
        });
    }
    candidates
}

fn trap_bonus(me: usize, tile: Position, tuning: &BrainTuning, view: &Surroundings<'_>) -> f32 {
    let mut bonus = 0.0;
    if view
        .player_head
        .is_some_and(|head| head.distance(tile) < tuning.trap_radius)
    {
        bonus += tuning.trap_player_bonus;
    }
    let rivals = view.occupancy.heads_near(tile, tuning.trap_radius, me);
    bonus + tuning.trap_rival_bonus * rivals as f32
}

/// Pick the best-scoring candidate, breaking ties uniformly at random.
pub fn pick_best(candidates: &[Candidate], rng: &mut impl Rng) -> Option<Direction> {
    let top = candidates.iter().map(|c| OrderedFloat(c.score)).max()?;
    let best: Vec<Direction> = candidates
        .iter()
        .filter(|c| OrderedFloat(c.score) == top)
        .map(|c| c.direction)
        .collect();
    match best.as_slice() {
        [only] => Some(*only),
        _ => Some(best[rng.random_range(0..best.len())]),
    }
}

/// Full decision for one AI tick: update the forager state from the head's
/// nearest-apple distance, then score and pick. `None` when every neighbour is
/// blocked.
pub fn decide(
    me: usize,
    head: Position,
    state: &mut ForagerState,
    tuning: &BrainTuning,
    view: &Surroundings<'_>,
    rng: &mut impl Rng,
) -> Option<Direction> {
    state.observe(view.apples.nearest_distance(head), tuning);
    let candidates = score_candidates(me, head, state, tuning, view, rng);
    pick_best(&candidates, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZoneSnakeConfig;
    use crate::agent::{AgentArena, AgentKind, Cadence, Snake};
    use rand::{SeedableRng, rngs::SmallRng};

    struct Fixture {
        geometry: GridGeometry,
        apples: AppleField,
        arena: AgentArena,
        tuning: BrainTuning,
    }

    impl Fixture {
        fn new() -> Self {
            let config = ZoneSnakeConfig::default();
            let geometry = GridGeometry::new(16, 480, 800).expect("geometry");
            Self {
                geometry,
                apples: AppleField::new(geometry, 4, 24.0),
                arena: AgentArena::new(),
                tuning: config.brain_tuning(),
            }
        }

        fn add(&mut self, kind: AgentKind, body: &[(i32, i32)]) -> usize {
            let idx = self.arena.len();
            self.arena.insert(Snake::new(
                format!("agent-{idx}"),
                kind,
                body.iter().map(|&(x, y)| Position::new(x, y)),
                Direction::Right,
                Cadence::new(150.0),
            ));
            idx
        }

        fn occupancy(&self) -> Occupancy {
            let mut occ = Occupancy::new(&self.geometry).expect("occupancy");
            occ.rebuild(&self.arena);
            occ
        }
    }

    fn score_of(candidates: &[Candidate], direction: Direction) -> Option<f32> {
        candidates
            .iter()
            .find(|c| c.direction == direction)
            .map(|c| c.score)
    }

    #[test]
    fn six_non_improving_observations_enter_exploring() {
        let tuning = ZoneSnakeConfig::default().brain_tuning();
        let mut state = ForagerState::new();
        assert_eq!(state.observe(100.0, &tuning), ForageMode::Foraging);
        for step in 1..=5 {
            assert_eq!(state.observe(100.0, &tuning), ForageMode::Foraging, "step {step}");
            assert_eq!(state.stuck(), step);
        }
        assert_eq!(state.observe(120.0, &tuning), ForageMode::Exploring);
        assert_eq!(state.stuck(), 0);
        assert_eq!(state.cooldown_ms(), 3_000.0);
    }

    #[test]
    fn improvement_resets_stuck_counter() {
        let tuning = ZoneSnakeConfig::default().brain_tuning();
        let mut state = ForagerState::new();
        state.observe(50.0, &tuning);
        state.observe(50.0, &tuning);
        state.observe(60.0, &tuning);
        assert_eq!(state.stuck(), 2);
        state.observe(59.0, &tuning);
        assert_eq!(state.stuck(), 0);
    }

    #[test]
    fn exploring_expires_after_cooldown_regardless_of_distance() {
        let tuning = ZoneSnakeConfig::default().brain_tuning();
        let mut state = ForagerState::new();
        for _ in 0..7 {
            state.observe(f32::INFINITY, &tuning);
        }
        assert_eq!(state.mode(), ForageMode::Exploring);
        state.tick_cooldown(2_999.0);
        assert_eq!(state.observe(1.0, &tuning), ForageMode::Exploring);
        state.tick_cooldown(1.0);
        assert_eq!(state.observe(f32::INFINITY, &tuning), ForageMode::Foraging);
    }

    #[test]
    fn moves_toward_a_reachable_apple() {
        let mut fx = Fixture::new();
        let me = fx.add(AgentKind::Ai, &[(160, 160)]);
        assert!(fx.apples.insert(Position::new(192, 160)));
        let occ = fx.occupancy();
        let view = Surroundings {
            geometry: &fx.geometry,
            apples: &fx.apples,
            occupancy: &occ,
            player_head: None,
        };
        for seed in 0..16 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut state = ForagerState::new();
            let head = Position::new(160, 160);
            let choice = decide(me, head, &mut state, &fx.tuning, &view, &mut rng);
            assert_eq!(choice, Some(Direction::Right), "seed {seed}");
        }
    }

    #[test]
    fn candidate_on_apple_gets_no_food_pull() {
        // Distance zero yields no food bonus, so the move that would eat the
        // apple loses to the diagonal neighbours.
        let mut fx = Fixture::new();
        let me = fx.add(AgentKind::Ai, &[(160, 160)]);
        assert!(fx.apples.insert(Position::new(176, 160)));
        let occ = fx.occupancy();
        let view = Surroundings {
            geometry: &fx.geometry,
            apples: &fx.apples,
            occupancy: &occ,
            player_head: None,
        };
        let tuning = BrainTuning {
            trap_check_one_in: u32::MAX,
            ..fx.tuning
        };
        let mut rng = SmallRng::seed_from_u64(1);
        let head = Position::new(160, 160);
        let candidates = score_candidates(me, head, &ForagerState::new(), &tuning, &view, &mut rng);
        assert_eq!(score_of(&candidates, Direction::Right), Some(15.0));
        let up = score_of(&candidates, Direction::Up).expect("up legal");
        assert!(up > 15.0);
        let choice = pick_best(&candidates, &mut rng);
        assert!(matches!(choice, Some(Direction::Up | Direction::Down)));
    }

    #[test]
    fn fully_boxed_agent_has_no_move() {
        let mut fx = Fixture::new();
        let me = fx.add(AgentKind::Ai, &[(160, 160)]);
        fx.add(AgentKind::Ai, &[(160, 144)]);
        fx.add(AgentKind::Ai, &[(160, 176)]);
        fx.add(AgentKind::Ai, &[(144, 160)]);
        fx.add(AgentKind::Player, &[(176, 160)]);
        let occ = fx.occupancy();
        let view = Surroundings {
            geometry: &fx.geometry,
            apples: &fx.apples,
            occupancy: &occ,
            player_head: Some(Position::new(176, 160)),
        };
        let mut rng = SmallRng::seed_from_u64(9);
        let mut state = ForagerState::new();
        let head = Position::new(160, 160);
        let choice = decide(me, head, &mut state, &fx.tuning, &view, &mut rng);
        assert_eq!(choice, None);
    }

    #[test]
    fn crowded_zone_is_penalised() {
        let mut fx = Fixture::new();
        let me = fx.add(AgentKind::Ai, &[(464, 160)]);
        for y in [0, 32, 64, 96] {
            fx.add(AgentKind::Ai, &[(560, y)]);
        }
        let occ = fx.occupancy();
        let view = Surroundings {
            geometry: &fx.geometry,
            apples: &fx.apples,
            occupancy: &occ,
            player_head: None,
        };
        let mut state = ForagerState::new();
        state.mark_visited(ZoneKey::new(0, 0));
        let tuning = BrainTuning {
            trap_check_one_in: u32::MAX,
            ..fx.tuning
        };
        let mut rng = SmallRng::seed_from_u64(2);
        let head = Position::new(464, 160);
        let candidates = score_candidates(me, head, &state, &tuning, &view, &mut rng);
        // Zone (1,0) holds four other heads: -20 crowding, +5 unvisited.
        assert_eq!(score_of(&candidates, Direction::Right), Some(-15.0));
        assert_eq!(score_of(&candidates, Direction::Left), Some(0.0));
    }

    #[test]
    fn exploring_skips_food_term() {
        let mut fx = Fixture::new();
        let me = fx.add(AgentKind::Ai, &[(160, 160)]);
        assert!(fx.apples.insert(Position::new(192, 160)));
        let occ = fx.occupancy();
        let view = Surroundings {
            geometry: &fx.geometry,
            apples: &fx.apples,
            occupancy: &occ,
            player_head: None,
        };
        let mut state = ForagerState::new();
        for _ in 0..7 {
            state.observe(500.0, &fx.tuning);
        }
        assert_eq!(state.mode(), ForageMode::Exploring);
        let mut rng = SmallRng::seed_from_u64(4);
        let head = Position::new(160, 160);
        for candidate in score_candidates(me, head, &state, &fx.tuning, &view, &mut rng) {
            // 10 per apple in zone, 5 for the unvisited zone, jitter in 0..=10.
            assert!((15.0..=25.0).contains(&candidate.score), "{candidate:?}");
        }
    }

    #[test]
    fn trap_bonus_counts_player_and_each_rival() {
        let mut fx = Fixture::new();
        let me = fx.add(AgentKind::Ai, &[(160, 160)]);
        fx.add(AgentKind::Ai, &[(208, 160)]);
        fx.add(AgentKind::Ai, &[(176, 192)]);
        fx.add(AgentKind::Player, &[(176, 128)]);
        let occ = fx.occupancy();
        let view = Surroundings {
            geometry: &fx.geometry,
            apples: &fx.apples,
            occupancy: &occ,
            player_head: Some(Position::new(176, 128)),
        };
        // From (176,160): player 32 away, rivals 32 and 32 away.
        assert_eq!(trap_bonus(me, Position::new(176, 160), &fx.tuning, &view), 40.0);
        // From (144,160): player ~45.3 away, rival (208,160) 64 away, (176,192) ~45.3 away.
        assert_eq!(trap_bonus(me, Position::new(144, 160), &fx.tuning, &view), 30.0);
    }

    #[test]
    fn trap_bonus_is_added_when_the_check_fires() {
        let mut fx = Fixture::new();
        let me = fx.add(AgentKind::Ai, &[(160, 160)]);
        fx.add(AgentKind::Ai, &[(208, 160)]);
        let occ = fx.occupancy();
        let view = Surroundings {
            geometry: &fx.geometry,
            apples: &fx.apples,
            occupancy: &occ,
            player_head: None,
        };
        let tuning = BrainTuning {
            trap_check_one_in: 1,
            ..fx.tuning
        };
        let mut rng = SmallRng::seed_from_u64(8);
        let head = Position::new(160, 160);
        let candidates = score_candidates(me, head, &ForagerState::new(), &tuning, &view, &mut rng);
        // Only the right-hand tile is within 48 of the rival's head.
        assert_eq!(score_of(&candidates, Direction::Right), Some(15.0));
        for direction in [Direction::Up, Direction::Down, Direction::Left] {
            assert_eq!(score_of(&candidates, direction), Some(5.0), "{direction:?}");
        }
    }

    #[test]
    fn exploring_never_adds_trap_bonus() {
        let mut fx = Fixture::new();
        let me = fx.add(AgentKind::Ai, &[(160, 160)]);
        fx.add(AgentKind::Ai, &[(208, 160)]);
        fx.add(AgentKind::Player, &[(176, 128)]);
        let occ = fx.occupancy();
        let view = Surroundings {
            geometry: &fx.geometry,
            apples: &fx.apples,
            occupancy: &occ,
            player_head: Some(Position::new(176, 128)),
        };
        let tuning = BrainTuning {
            trap_check_one_in: 1,
            explore_jitter_max: 0,
            ..fx.tuning
        };
        let mut state = ForagerState::new();
        for _ in 0..7 {
            state.observe(500.0, &tuning);
        }
        assert_eq!(state.mode(), ForageMode::Exploring);
        let mut rng = SmallRng::seed_from_u64(8);
        let head = Position::new(160, 160);
        for candidate in score_candidates(me, head, &state, &tuning, &view, &mut rng) {
            assert_eq!(candidate.score, 5.0, "{candidate:?}");
        }
    }

    #[test]
    fn ties_are_broken_among_top_scores_only() {
        let candidates = [
            Candidate {
                direction: Direction::Up,
                tile: Position::new(0, -16),
                score: 3.0,
            },
            Candidate {
                direction: Direction::Down,
                tile: Position::new(0, 16),
                score: 7.0,
            },
            Candidate {
                direction: Direction::Left,
                tile: Position::new(-16, 0),
                score: 7.0,
            },
        ];
        let mut seen = HashSet::new();
        for seed in 0..64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            seen.insert(pick_best(&candidates, &mut rng).expect("choice"));
        }
        assert_eq!(seen, HashSet::from([Direction::Down, Direction::Left]));
        assert_eq!(pick_best(&[], &mut SmallRng::seed_from_u64(0)), None);
    }

    #[test]
    fn reverse_is_legal_for_ai_when_it_is_the_only_exit() {
        let mut fx = Fixture::new();
        let me = fx.add(AgentKind::Ai, &[(160, 160)]);
        fx.add(AgentKind::Ai, &[(160, 144)]);
        fx.add(AgentKind::Ai, &[(160, 176)]);
        fx.add(AgentKind::Ai, &[(176, 160)]);
        let occ = fx.occupancy();
        let view = Surroundings {
            geometry: &fx.geometry,
            apples: &fx.apples,
            occupancy: &occ,
            player_head: None,
        };
        let mut rng = SmallRng::seed_from_u64(6);
        let mut state = ForagerState::new();
        // Facing right; left is the reverse and the only free tile.
        assert_eq!(
            decide(me, Position::new(160, 160), &mut state, &fx.tuning, &view, &mut rng),
            Some(Direction::Left)
        );
    }
}
