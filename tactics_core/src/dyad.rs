//! Pairing of the two nearest friendly agents with each detected threat.
//!
//! Threats are served in stable discovery order: the tick a threat was first
//! reported, then ascending threat id within that tick. An agent that has been
//! partnered once this episode is no longer eligible, so two threats competing
//! for the same nearest agent resolve in favour of the earlier-discovered one.

use std::collections::HashSet;

use bevy::prelude::Resource;

use crate::{
    agents::{AgentId, AgentTable},
    threat_field::{ThreatDescriptor, ThreatId},
};

/// Two cooperating agents assigned to one threat.
#[derive(Debug, Clone, PartialEq)]
pub struct Dyad {
    /// Nearest agent at formation time.
    pub first: AgentId,
    /// Second-nearest agent at formation time.
    pub second: AgentId,
    pub threat: ThreatId,
    pub formed_tick: u64,
}

impl Dyad {
    pub fn members(&self) -> [AgentId; 2] {
        [self.first, self.second]
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.first == agent || self.second == agent
    }

    pub fn partner_of(&self, agent: AgentId) -> Option<AgentId> {
        if agent == self.first {
            Some(self.second)
        } else if agent == self.second {
            Some(self.first)
        } else {
            None
        }
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct DyadRegistry {
    dyads: Vec<Dyad>,
    discovery: Vec<ThreatId>,
    seen: HashSet<ThreatId>,
}

impl DyadRegistry {
    /// Append newly reported threats to the discovery order.
    pub fn observe_threats(&mut self, threats: &[ThreatDescriptor]) -> usize {
        let mut fresh: Vec<ThreatId> = threats
            .iter()
            .map(|threat| threat.id)
            .filter(|id| !self.seen.contains(id))
            .collect();
        fresh.sort_unstable();
        fresh.dedup();
        for id in &fresh {
            self.seen.insert(*id);
            self.discovery.push(*id);
        }
        fresh.len()
    }

    /// Form dyads for every present, unpaired threat that still has two
    /// eligible agents. Returns the dyads formed on this call.
    pub fn form(
        &mut self,
        agents: &mut AgentTable,
        threats: &[ThreatDescriptor],
        tick: u64,
    ) -> Vec<Dyad> {
        self.observe_threats(threats);

        let mut formed = Vec::new();
        for threat_id in self.discovery.clone() {
            if self.for_threat(threat_id).is_some() {
                continue;
            }
            let Some(threat) = threats.iter().find(|threat| threat.id == threat_id) else {
                continue;
            };

            let mut candidates: Vec<(f32, AgentId)> = agents
                .alive()
                .filter(|record| record.partner.is_none())
                .map(|record| (record.position.distance(threat.position), record.id))
                .collect();
            if candidates.len() < 2 {
                tracing::debug!(
                    target: "squad_tactics::dyad",
                    threat = %threat_id,
                    eligible = candidates.len(),
                    "dyad.deferred=insufficient_agents"
                );
                continue;
            }
            candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            let dyad = Dyad {
                first: candidates[0].1,
                second: candidates[1].1,
                threat: threat_id,
                formed_tick: tick,
            };
            agents.link_partners(dyad.first, dyad.second);
            tracing::info!(
                target: "squad_tactics::dyad",
                threat = %threat_id,
                first = %dyad.first,
                second = %dyad.second,
                tick,
                "dyad.formed"
            );
            self.dyads.push(dyad.clone());
            formed.push(dyad);
        }
        formed
    }

    pub fn dyads(&self) -> &[Dyad] {
        &self.dyads
    }

    pub fn for_threat(&self, threat: ThreatId) -> Option<&Dyad> {
        self.dyads.iter().find(|dyad| dyad.threat == threat)
    }

    pub fn for_agent(&self, agent: AgentId) -> Option<&Dyad> {
        self.dyads.iter().find(|dyad| dyad.contains(agent))
    }

    pub fn discovery_order(&self) -> &[ThreatId] {
        &self.discovery
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec2;

    use super::*;
    use crate::{agents::AgentRecord, grid::GridDims, strategy::StrategyType};

    fn table(positions: &[(u64, Vec2)]) -> AgentTable {
        let mut table = AgentTable::default();
        for (id, pos) in positions {
            table.insert(AgentRecord::new(
                AgentId(*id),
                *pos,
                StrategyType::Greedy,
                GridDims::new(4, 4),
            ));
        }
        table
    }

    #[test]
    fn nearest_two_agents_pair_up() {
        let mut agents = table(&[
            (1, Vec2::new(0.0, 0.0)),
            (2, Vec2::new(9.0, 0.0)),
            (3, Vec2::new(4.0, 0.0)),
        ]);
        let threat = ThreatDescriptor::new(ThreatId(10), Vec2::new(10.0, 0.0), 8.0);
        let mut registry = DyadRegistry::default();

        let formed = registry.form(&mut agents, &[threat.clone()], 0);
        assert_eq!(formed.len(), 1);
        assert_eq!(formed[0].first, AgentId(2));
        assert_eq!(formed[0].second, AgentId(3));
        assert_eq!(agents.get(AgentId(2)).unwrap().partner, Some(AgentId(3)));
        assert!(agents.get(AgentId(1)).unwrap().partner.is_none());

        // Formed once per threat.
        assert!(registry.form(&mut agents, &[threat], 1).is_empty());
    }

    #[test]
    fn lone_agent_defers_formation() {
        let mut agents = table(&[(1, Vec2::ZERO)]);
        let threat = ThreatDescriptor::new(ThreatId(5), Vec2::ONE, 8.0);
        let mut registry = DyadRegistry::default();
        assert!(registry.form(&mut agents, &[threat], 0).is_empty());
        assert_eq!(registry.discovery_order(), &[ThreatId(5)]);
    }

    #[test]
    fn distance_ties_break_by_agent_id() {
        let mut agents = table(&[
            (7, Vec2::new(-1.0, 0.0)),
            (3, Vec2::new(1.0, 0.0)),
            (5, Vec2::new(0.0, 1.0)),
        ]);
        let threat = ThreatDescriptor::new(ThreatId(1), Vec2::ZERO, 8.0);
        let mut registry = DyadRegistry::default();
        let formed = registry.form(&mut agents, &[threat], 0);
        assert_eq!(formed[0].members(), [AgentId(3), AgentId(5)]);
    }
}
