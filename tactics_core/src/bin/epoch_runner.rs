use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tactics_core::arena::{ArenaConfig, ArenaHost};
use tactics_core::{
    load_tactics_config_from_env, EpochRunner, JsonFileStore, StrategyType, TacticsConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run sequential tactics epochs against the arena host", long_about = None)]
struct Cli {
    /// JSON file holding the payoff matrix shared across epochs.
    #[arg(long, default_value = "payoff_matrix.json")]
    store: PathBuf,
    /// Number of epochs to run.
    #[arg(long, default_value_t = 10)]
    epochs: u64,
    /// Base arena seed; epoch `n` uses `seed + n`.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Comma-separated strategy roster, e.g. `rational,rational,greedy`.
    #[arg(long, value_delimiter = ',')]
    roster: Vec<StrategyType>,
    /// Number of threats spawned per epoch.
    #[arg(long)]
    threats: Option<u32>,
    /// Tactics configuration file; defaults to `TACTICS_CONFIG_PATH` or the builtin.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Arena configuration file.
    #[arg(long)]
    arena: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Arc::new(
            TacticsConfig::from_file(path)
                .with_context(|| format!("loading tactics config {}", path.display()))?,
        ),
        None => load_tactics_config_from_env().0,
    };

    let mut arena = match &cli.arena {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading arena config {}", path.display()))?;
            serde_json::from_str::<ArenaConfig>(&contents)
                .with_context(|| format!("parsing arena config {}", path.display()))?
        }
        None => ArenaConfig::default(),
    };
    if !cli.roster.is_empty() {
        arena.roster = cli.roster.clone();
    }
    if let Some(threats) = cli.threats {
        arena.threats = threats;
    }

    let runner = EpochRunner::new(config);
    let mut store = JsonFileStore::new(&cli.store);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for epoch in 0..cli.epochs {
        let mut host = ArenaHost::new(ArenaConfig {
            seed: cli.seed.wrapping_add(epoch),
            ..arena.clone()
        })?;
        let report = runner
            .run_epoch(epoch, &mut host, &mut store)
            .with_context(|| format!("epoch {epoch} failed"))?;
        for result in &report.results {
            writeln!(out, "{}", serde_json::to_string(result)?)?;
        }
        info!(
            target: "squad_tactics::runner",
            epoch,
            dyads = report.settlements.len(),
            matrix_updates = report.matrix_updates,
            "runner.epoch_finished"
        );
    }

    info!(
        target: "squad_tactics::runner",
        epochs = cli.epochs,
        store = %store.path().display(),
        "runner.finished"
    );
    Ok(())
}
