use std::collections::HashMap;
use std::fmt;

use bevy::{math::Vec2, prelude::Resource};
use serde::Serialize;

use crate::{
    grid::GridDims,
    payoff::Action,
    strategy::StrategyType,
    vision::SafetyGrid,
};

/// Identifier for a friendly unit reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Episode-lifetime state of one friendly agent.
#[derive(Debug, Clone)]
pub struct AgentRecord {
    pub id: AgentId,
    pub position: Vec2,
    pub strategy: StrategyType,
    pub score: f64,
    pub partner: Option<AgentId>,
    pub action: Option<Action>,
    pub alive: bool,
    pub safety: SafetyGrid,
}

impl AgentRecord {
    pub fn new(id: AgentId, position: Vec2, strategy: StrategyType, dims: GridDims) -> Self {
        Self {
            id,
            position,
            strategy,
            score: 0.0,
            partner: None,
            action: None,
            alive: true,
            safety: SafetyGrid::new(dims),
        }
    }
}

/// Indexed table of every agent seen this episode.
///
/// Records are never removed; a vanished unit is marked dead and stays dead.
#[derive(Resource, Debug, Clone, Default)]
pub struct AgentTable {
    records: Vec<AgentRecord>,
    index: HashMap<AgentId, usize>,
}

impl AgentTable {
    /// Insert a new record. Returns `false` when the id is already known.
    pub fn insert(&mut self, record: AgentRecord) -> bool {
        if self.index.contains_key(&record.id) {
            return false;
        }
        self.index.insert(record.id, self.records.len());
        self.records.push(record);
        true
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: AgentId) -> Option<&AgentRecord> {
        self.index.get(&id).map(|idx| &self.records[*idx])
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentRecord> {
        let idx = *self.index.get(&id)?;
        self.records.get_mut(idx)
    }

    /// Unknown ids count as dead.
    pub fn is_alive(&self, id: AgentId) -> bool {
        self.get(id).is_some_and(|record| record.alive)
    }

    /// Mark an agent dead. Returns `true` on the alive-to-dead transition.
    pub fn mark_dead(&mut self, id: AgentId) -> bool {
        match self.get_mut(id) {
            Some(record) if record.alive => {
                record.alive = false;
                true
            }
            _ => false,
        }
    }

    /// Cross-link two agents as partners.
    pub fn link_partners(&mut self, first: AgentId, second: AgentId) {
        if let Some(record) = self.get_mut(first) {
            record.partner = Some(second);
        }
        if let Some(record) = self.get_mut(second) {
            record.partner = Some(first);
        }
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentRecord> {
        self.records.iter_mut()
    }

    pub fn alive(&self) -> impl Iterator<Item = &AgentRecord> {
        self.records.iter().filter(|record| record.alive)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64) -> AgentRecord {
        AgentRecord::new(
            AgentId(id),
            Vec2::ZERO,
            StrategyType::Rational,
            GridDims::new(2, 2),
        )
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut table = AgentTable::default();
        assert!(table.insert(record(1)));
        assert!(!table.insert(record(1)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn death_is_reported_once() {
        let mut table = AgentTable::default();
        table.insert(record(4));
        assert!(table.mark_dead(AgentId(4)));
        assert!(!table.mark_dead(AgentId(4)));
        assert!(!table.is_alive(AgentId(4)));
        assert!(!table.is_alive(AgentId(99)));
    }

    #[test]
    fn partners_reference_each_other_by_id() {
        let mut table = AgentTable::default();
        table.insert(record(1));
        table.insert(record(2));
        table.link_partners(AgentId(1), AgentId(2));
        assert_eq!(table.get(AgentId(1)).unwrap().partner, Some(AgentId(2)));
        assert_eq!(table.get(AgentId(2)).unwrap().partner, Some(AgentId(1)));
    }
}
