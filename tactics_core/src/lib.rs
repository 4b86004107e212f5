//! Core tactics crate for safety-field micro-control and payoff-matrix
//! coordination of friendly units.
//!
//! Each host tick is resolved by the chained ECS systems registered in
//! [`build_episode_app`] when [`run_tick`] is invoked; [`EpochRunner`] drives a
//! whole episode against a [`TacticalHost`] and persists the shared
//! [`PayoffMatrix`] through a [`MatrixStore`].

pub mod accountant;
pub mod agents;
pub mod arena;
mod commands;
pub mod dyad;
mod epoch;
pub mod grid;
mod host;
pub mod navigator;
pub mod payoff;
mod resources;
pub mod store;
pub mod strategy;
mod systems;
pub mod tactics_config;
pub mod terrain;
pub mod threat_field;
pub mod vision;

use std::sync::Arc;

use bevy::prelude::*;

pub use accountant::{AgentResult, DyadSettlement, EpisodeAccountant};
pub use agents::{AgentId, AgentRecord, AgentTable};
pub use commands::{CommandKind, CommandQueue, UnitCommand};
pub use dyad::{Dyad, DyadRegistry};
pub use epoch::{EpochError, EpochReport, EpochRunner};
pub use grid::{BoolGrid, Cell, GridDims, GridError};
pub use host::{AgentObservation, HostFrame, TacticalHost};
pub use navigator::{select_target, NavigationTarget};
pub use payoff::{Action, PayoffCell, PayoffMatrix};
pub use resources::EpisodeClock;
pub use store::{JsonFileStore, MatrixStore, MemoryStore, StoreError};
pub use strategy::{choose_action, Decision, RationalBasis, StrategyType};
pub use systems::retire_absent_agents;
pub use tactics_config::{
    load_tactics_config_from_env, TacticsConfig, TacticsConfigError, TacticsConfigHandle,
};
pub use terrain::TerrainModel;
pub use threat_field::{apply_threats, ThreatDescriptor, ThreatId};
pub use vision::{PerceptOutcome, SafetyGrid};

/// Construct a Bevy [`App`] holding the state of one episode.
pub fn build_episode_app(
    config: Arc<TacticsConfig>,
    terrain: TerrainModel,
    matrix: PayoffMatrix,
) -> App {
    let mut app = App::new();

    let clock = EpisodeClock::new(&config.episode);
    let accountant = EpisodeAccountant::new(config.scoring.clone());

    app.insert_resource(TacticsConfigHandle::new(config))
        .insert_resource(terrain)
        .insert_resource(matrix)
        .insert_resource(clock)
        .insert_resource(accountant)
        .insert_resource(HostFrame::default())
        .insert_resource(AgentTable::default())
        .insert_resource(DyadRegistry::default())
        .insert_resource(CommandQueue::default())
        .add_plugins(MinimalPlugins)
        .add_systems(
            Update,
            (
                systems::sync_agents,
                systems::perceive_environment,
                systems::apply_threat_fields,
                systems::form_dyads,
                systems::decide_actions,
                systems::emit_commands,
                systems::accrue_tick_scores,
                systems::advance_clock,
            )
                .chain(),
        );

    app
}

/// Resolve a single host tick and return the commands it produced.
///
/// Each call processes the chained systems configured in [`build_episode_app`]
/// (agents → perception → threat fields → dyads → decisions → commands →
/// tick rewards → clock).
pub fn run_tick(app: &mut App, frame: HostFrame) -> Vec<UnitCommand> {
    app.world.insert_resource(frame);
    app.update();
    app.world.resource_mut::<CommandQueue>().drain()
}
