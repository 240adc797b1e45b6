use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use zonesnake_app::{Cli, run_headless};

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.load_config()?;
    info!(
        population = config.ai_population,
        frames = cli.frames,
        frame_ms = cli.frame_ms,
        "Starting zonesnake headless run"
    );

    let report = run_headless(config, &cli)?;
    let summary = &report.summary;
    info!(
        frames = summary.frames,
        alive = summary.final_alive,
        deaths = summary.total_deaths,
        apples_eaten = summary.apples_eaten,
        player_alive = summary.player_alive,
        player_length = summary.player_length,
        winner = summary.winner.as_deref().unwrap_or("-"),
        extinct = summary.extinct,
        "Run complete"
    );

    if let Some(path) = &cli.report {
        report
            .write_json(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Wrote run report");
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
