//! Headless driver for the zonesnake simulation: configuration loading, a
//! scripted player and a JSON run report.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use zonesnake_core::{FrameEvents, World, ZoneSnakeConfig};

/// Frames run when `--frames` is not supplied.
pub const DEFAULT_FRAMES: u64 = 2_000;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "zonesnake",
    version,
    about = "Run a headless zone-partitioned snake simulation"
)]
pub struct Cli {
    /// JSON configuration file; omitted fields keep their defaults.
    #[arg(short, long, env = "ZONESNAKE_CONFIG")]
    pub config: Option<PathBuf>,
    /// RNG seed for a reproducible run.
    #[arg(long, env = "ZONESNAKE_SEED")]
    pub seed: Option<u64>,
    /// Number of AI snakes to spawn.
    #[arg(long)]
    pub population: Option<usize>,
    /// Frames to simulate.
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    pub frames: u64,
    /// Elapsed milliseconds fed to each frame.
    #[arg(long, default_value_t = 16.0)]
    pub frame_ms: f32,
    /// Leave the player without input instead of steering it toward apples.
    #[arg(long)]
    pub idle_player: bool,
    /// Stop early once a single snake (or none) remains.
    #[arg(long)]
    pub stop_on_winner: bool,
    /// Write a JSON report of the run to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Resolve the world configuration: file first, then command-line overrides.
    pub fn load_config(&self) -> Result<ZoneSnakeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_json::from_str::<ZoneSnakeConfig>(&raw).with_context(|| {
                    format!("config file {} did not contain valid JSON", path.display())
                })?
            }
            None => ZoneSnakeConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.rng_seed = Some(seed);
        }
        if let Some(population) = self.population {
            config.ai_population = population;
        }
        if !(self.frame_ms >= 0.0 && self.frame_ms.is_finite()) {
            bail!("--frame-ms must be a non-negative number");
        }
        Ok(config)
    }
}

/// Per-frame counters retained in the report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub alive: usize,
    pub apples: usize,
    pub deaths: usize,
    pub zone_entries: usize,
    pub apples_eaten: usize,
}

impl FrameStats {
    fn from_events(world: &World, events: &FrameEvents) -> Self {
        Self {
            frame: events.frame.0,
            alive: world.live_count(),
            apples: world.apples().total(),
            deaths: events.deaths.len(),
            zone_entries: events.zone_entries.len(),
            apples_eaten: events.apples_eaten.len(),
        }
    }
}

/// Outcome of a headless run.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReportSummary {
    pub frames: u64,
    pub initial_alive: usize,
    pub final_alive: usize,
    pub total_deaths: usize,
    pub apples_eaten: usize,
    pub player_alive: bool,
    pub player_length: usize,
    pub winner: Option<String>,
    pub extinct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadlessReport {
    pub seed: Option<u64>,
    pub frames: Vec<FrameStats>,
    pub summary: ReportSummary,
}

impl HeadlessReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).context("failed to serialize headless report")?;
        Ok(())
    }
}

/// Steer the player toward the nearest apple, the way a tapping user would.
fn steer_toward_food(world: &mut World) {
    let Some(head) = world.player_head() else {
        return;
    };
    if let Some(apple) = world.apples().nearest(head) {
        world.tap_player(apple.x as f32, apple.y as f32);
    }
}

/// Populate a world from `config` and run it for `frames` frames of `frame_ms` each.
pub fn run_headless(config: ZoneSnakeConfig, cli: &Cli) -> Result<HeadlessReport> {
    let seed = config.rng_seed;
    let mut world = World::populated(config).context("failed to build world")?;
    let initial_alive = world.live_count();
    let mut frames = Vec::with_capacity(cli.frames.min(100_000) as usize);
    let mut summary = ReportSummary {
        initial_alive,
        ..ReportSummary::default()
    };

    for _ in 0..cli.frames {
        if !cli.idle_player {
            steer_toward_food(&mut world);
        }
        let events = world.step(cli.frame_ms);
        if events.player_died {
            info!(frame = events.frame.0, "player died; spectating");
        }
        if let Some(winner) = events.winner.and_then(|id| world.agent(id)) {
            info!(frame = events.frame.0, winner = %winner.label, "last snake standing");
        }
        for entry in &events.zone_entries {
            if Some(entry.agent) == world.player() {
                debug!(zone_x = entry.zone.x, zone_y = entry.zone.y, "player entered zone");
            }
        }
        summary.total_deaths += events.deaths.len();
        summary.apples_eaten += events.apples_eaten.len();
        frames.push(FrameStats::from_events(&world, &events));
        summary.frames += 1;

        if cli.stop_on_winner && world.live_count() <= 1 {
            break;
        }
    }

    let player = world.player().and_then(|id| world.agent(id));
    summary.final_alive = world.live_count();
    summary.player_alive = player.is_some_and(|p| p.is_alive());
    summary.player_length = player.map_or(0, |p| p.len());
    summary.winner = world
        .winner()
        .and_then(|id| world.agent(id))
        .map(|snake| snake.label.clone());
    summary.extinct = world.is_extinct();

    Ok(HeadlessReport {
        seed,
        frames,
        summary,
    })
}
