//! Seam between the tactics layer and the simulation that owns the units.

use std::collections::HashSet;

use bevy::{math::Vec2, prelude::Resource};

use crate::{
    agents::AgentId,
    commands::UnitCommand,
    grid::BoolGrid,
    strategy::StrategyType,
    terrain::TerrainModel,
    threat_field::{ThreatDescriptor, ThreatId},
};

/// One friendly unit as reported by the host for the current tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentObservation {
    pub id: AgentId,
    pub position: Vec2,
    pub strategy: StrategyType,
    /// Cells this unit can see this tick.
    pub visibility: BoolGrid,
}

/// Host observation for one tick. Units and threats missing from a frame are dead.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct HostFrame {
    pub tick: u64,
    pub agents: Vec<AgentObservation>,
    pub threats: Vec<ThreatDescriptor>,
}

impl HostFrame {
    pub fn agent(&self, id: AgentId) -> Option<&AgentObservation> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub fn threat_ids(&self) -> HashSet<ThreatId> {
        self.threats.iter().map(|threat| threat.id).collect()
    }
}

/// Simulation driving the episode: supplies terrain and observations, executes
/// the commands produced for each tick.
pub trait TacticalHost {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Static terrain for the episode about to start.
    fn terrain(&self) -> TerrainModel;

    fn observe(&mut self, tick: u64) -> Result<HostFrame, Self::Error>;

    fn execute(&mut self, commands: &[UnitCommand]) -> Result<(), Self::Error>;
}
