//! One episode from matrix load to matrix persist.

use std::error::Error as StdError;
use std::sync::Arc;

use bevy::prelude::App;
use thiserror::Error;

use crate::{
    accountant::{AgentResult, DyadSettlement, EpisodeAccountant},
    agents::AgentTable,
    build_episode_app,
    dyad::DyadRegistry,
    host::{HostFrame, TacticalHost},
    payoff::PayoffMatrix,
    resources::EpisodeClock,
    run_tick,
    store::{MatrixStore, StoreError},
    systems::retire_absent_agents,
    tactics_config::TacticsConfig,
};

#[derive(Debug, Error)]
pub enum EpochError {
    #[error("host failed at tick {tick}: {source}")]
    Host {
        tick: u64,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EpochError {
    fn host(tick: u64, source: impl StdError + Send + Sync + 'static) -> Self {
        EpochError::Host {
            tick,
            source: Box::new(source),
        }
    }
}

/// Outcome of a completed episode.
#[derive(Debug, Clone)]
pub struct EpochReport {
    pub epoch: u64,
    pub ticks: u64,
    pub settlements: Vec<DyadSettlement>,
    pub results: Vec<AgentResult>,
    /// Matrix as persisted at the end of the episode.
    pub matrix: PayoffMatrix,
    pub matrix_updates: usize,
}

/// Runs episodes against a host, one at a time.
#[derive(Debug, Clone)]
pub struct EpochRunner {
    config: Arc<TacticsConfig>,
}

impl EpochRunner {
    pub fn new(config: Arc<TacticsConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TacticsConfig {
        &self.config
    }

    /// Run one full episode.
    ///
    /// The matrix is loaded before the first tick and saved once after the
    /// final frame is settled. A host failure aborts the episode without
    /// touching the store.
    pub fn run_epoch<H, S>(
        &self,
        epoch: u64,
        host: &mut H,
        store: &mut S,
    ) -> Result<EpochReport, EpochError>
    where
        H: TacticalHost,
        S: MatrixStore,
    {
        let matrix = store.load_or_template()?;
        let mut app = build_episode_app(Arc::clone(&self.config), host.terrain(), matrix);
        let max_ticks = app.world.resource::<EpisodeClock>().max_ticks;

        tracing::info!(
            target: "squad_tactics::epoch",
            epoch,
            max_ticks,
            "epoch.started"
        );

        for tick in 0..max_ticks {
            let frame = host
                .observe(tick)
                .map_err(|err| EpochError::host(tick, err))?;
            let commands = run_tick(&mut app, frame);
            tracing::debug!(
                target: "squad_tactics::epoch",
                epoch,
                tick,
                commands = commands.len(),
                "epoch.tick"
            );
            host
                .execute(&commands)
                .map_err(|err| EpochError::host(tick, err))?;
        }

        let final_frame = host
            .observe(max_ticks)
            .map_err(|err| EpochError::host(max_ticks, err))?;

        let (settlements, results, matrix, matrix_updates) =
            settle_episode(&mut app, epoch, &final_frame);

        store.save(&matrix)?;

        tracing::info!(
            target: "squad_tactics::epoch",
            epoch,
            dyads = settlements.len(),
            matrix_updates,
            visits = matrix.total_visits(),
            "epoch.completed"
        );

        Ok(EpochReport {
            epoch,
            ticks: max_ticks,
            settlements,
            results,
            matrix,
            matrix_updates,
        })
    }
}

type Settled = (Vec<DyadSettlement>, Vec<AgentResult>, PayoffMatrix, usize);

/// Retire agents missing from the final frame, apply terminal rewards and fold
/// rational outcomes into the episode's matrix.
fn settle_episode(app: &mut App, epoch: u64, final_frame: &HostFrame) -> Settled {
    let world = &mut app.world;
    let accountant = world.resource::<EpisodeAccountant>().clone();
    let dyads = world.resource::<DyadRegistry>().clone();
    let mut agents = world.remove_resource::<AgentTable>().unwrap_or_default();
    let mut matrix = world.remove_resource::<PayoffMatrix>().unwrap_or_default();

    retire_absent_agents(final_frame, &mut agents);
    let settlements = accountant.settle(&mut agents, &dyads, &final_frame.threat_ids());
    let matrix_updates = accountant.apply_to_matrix(&mut matrix, &agents, &settlements);
    let results = accountant.results(&agents, epoch);
    (settlements, results, matrix, matrix_updates)
}
