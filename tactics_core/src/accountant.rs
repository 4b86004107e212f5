//! Per-tick and terminal performance scoring for dyad members.

use std::collections::HashSet;

use bevy::prelude::Resource;
use serde::Serialize;

use crate::{
    agents::{AgentId, AgentTable},
    dyad::{Dyad, DyadRegistry},
    payoff::{Action, PayoffMatrix},
    strategy::StrategyType,
    tactics_config::ScoringConfig,
    threat_field::ThreatId,
};

/// Terminal outcome of one dyad.
#[derive(Debug, Clone, PartialEq)]
pub struct DyadSettlement {
    pub dyad: Dyad,
    pub alive: [bool; 2],
    pub actions: [Option<Action>; 2],
    pub threat_dead: bool,
    pub joint_attack_bonus: bool,
}

/// Result record handed to the collaborator that stores per-agent outcomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResult {
    pub id: AgentId,
    pub strategy: StrategyType,
    pub action: Option<Action>,
    pub score: f64,
    pub epoch: u64,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct EpisodeAccountant {
    scoring: ScoringConfig,
    ticks_credited: u64,
}

impl EpisodeAccountant {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self {
            scoring,
            ticks_credited: 0,
        }
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Dyad-ticks credited so far this episode.
    pub fn ticks_credited(&self) -> u64 {
        self.ticks_credited
    }

    /// Credit the tick reward to both members of every dyad whose members are
    /// both alive. Returns the number of dyads credited.
    pub fn accrue_tick(&mut self, agents: &mut AgentTable, dyads: &DyadRegistry) -> usize {
        let mut credited = 0;
        for dyad in dyads.dyads() {
            if !dyad.members().iter().all(|id| agents.is_alive(*id)) {
                continue;
            }
            for id in dyad.members() {
                if let Some(record) = agents.get_mut(id) {
                    record.score += self.scoring.tick_reward;
                }
            }
            credited += 1;
        }
        self.ticks_credited += credited as u64;
        credited
    }

    /// Apply survival rewards and the joint attack bonus.
    ///
    /// `surviving_threats` lists the threats still present in the final host
    /// frame; any other threat counts as dead, as does any agent missing from
    /// the table.
    pub fn settle(
        &self,
        agents: &mut AgentTable,
        dyads: &DyadRegistry,
        surviving_threats: &HashSet<ThreatId>,
    ) -> Vec<DyadSettlement> {
        let mut settlements = Vec::with_capacity(dyads.dyads().len());
        for dyad in dyads.dyads() {
            let members = dyad.members();
            let alive = members.map(|id| agents.is_alive(id));
            let actions = members.map(|id| agents.get(id).and_then(|record| record.action));
            let threat_dead = !surviving_threats.contains(&dyad.threat);
            let both_attacked = actions.iter().all(|action| *action == Some(Action::Attack));
            let survival_ok = !self.scoring.bonus_requires_survival || alive.iter().all(|a| *a);
            let joint_attack_bonus = threat_dead && both_attacked && survival_ok;

            for (id, is_alive) in members.into_iter().zip(alive) {
                let Some(record) = agents.get_mut(id) else {
                    continue;
                };
                record.score += if is_alive {
                    self.scoring.survival_reward
                } else {
                    -self.scoring.death_penalty
                };
                if joint_attack_bonus {
                    record.score += self.scoring.joint_attack_bonus;
                }
            }

            tracing::info!(
                target: "squad_tactics::accounting",
                threat = %dyad.threat,
                first = %dyad.first,
                second = %dyad.second,
                first_alive = alive[0],
                second_alive = alive[1],
                threat_dead,
                joint_attack_bonus,
                "dyad.settled"
            );

            settlements.push(DyadSettlement {
                dyad: dyad.clone(),
                alive,
                actions,
                threat_dead,
                joint_attack_bonus,
            });
        }
        settlements
    }

    /// Fold settled outcomes of rational members into the matrix.
    ///
    /// Each rational member records `[own score, partner score]` under
    /// `(own action, partner action)`. Returns the number of cell updates.
    pub fn apply_to_matrix(
        &self,
        matrix: &mut PayoffMatrix,
        agents: &AgentTable,
        settlements: &[DyadSettlement],
    ) -> usize {
        let mut updates = 0;
        for settlement in settlements {
            let dyad = &settlement.dyad;
            for (own_id, partner_id) in [(dyad.first, dyad.second), (dyad.second, dyad.first)] {
                let (Some(own), Some(partner)) = (agents.get(own_id), agents.get(partner_id))
                else {
                    continue;
                };
                if !own.strategy.updates_matrix() {
                    continue;
                }
                let (Some(own_action), Some(partner_action)) = (own.action, partner.action) else {
                    continue;
                };
                matrix.record(own_action, partner_action, [own.score, partner.score]);
                updates += 1;
            }
        }
        updates
    }

    /// Result records for every agent, in table order.
    pub fn results(&self, agents: &AgentTable, epoch: u64) -> Vec<AgentResult> {
        agents
            .iter()
            .map(|record| AgentResult {
                id: record.id,
                strategy: record.strategy,
                action: record.action,
                score: record.score,
                epoch,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec2;

    use super::*;
    use crate::{agents::AgentRecord, grid::GridDims, threat_field::ThreatDescriptor};

    fn setup(strategies: [StrategyType; 2]) -> (AgentTable, DyadRegistry) {
        let mut agents = AgentTable::default();
        for (idx, strategy) in strategies.into_iter().enumerate() {
            agents.insert(AgentRecord::new(
                AgentId(idx as u64 + 1),
                Vec2::new(idx as f32, 0.0),
                strategy,
                GridDims::new(2, 2),
            ));
        }
        let mut dyads = DyadRegistry::default();
        let threat = ThreatDescriptor::new(ThreatId(9), Vec2::new(-1.0, 0.0), 8.0);
        dyads.form(&mut agents, &[threat], 0);
        (agents, dyads)
    }

    #[test]
    fn tick_reward_stops_when_a_member_dies() {
        let (mut agents, dyads) = setup([StrategyType::Greedy; 2]);
        let mut accountant = EpisodeAccountant::new(ScoringConfig::default());

        assert_eq!(accountant.accrue_tick(&mut agents, &dyads), 1);
        agents.mark_dead(AgentId(2));
        assert_eq!(accountant.accrue_tick(&mut agents, &dyads), 0);

        assert_eq!(agents.get(AgentId(1)).unwrap().score, 0.5);
        assert_eq!(agents.get(AgentId(2)).unwrap().score, 0.5);
        assert_eq!(accountant.ticks_credited(), 1);
    }

    #[test]
    fn joint_bonus_for_surviving_attackers() {
        let (mut agents, dyads) = setup([StrategyType::Attacker; 2]);
        for record in agents.iter_mut() {
            record.action = Some(Action::Attack);
        }
        let accountant = EpisodeAccountant::new(ScoringConfig::default());
        let settlements = accountant.settle(&mut agents, &dyads, &HashSet::new());

        assert!(settlements[0].joint_attack_bonus);
        assert_eq!(agents.get(AgentId(1)).unwrap().score, 6.0);
        assert_eq!(agents.get(AgentId(2)).unwrap().score, 6.0);
    }

    #[test]
    fn only_rational_members_update_the_matrix() {
        let (mut agents, dyads) = setup([StrategyType::Rational, StrategyType::Runner]);
        agents.get_mut(AgentId(1)).unwrap().action = Some(Action::Attack);
        agents.get_mut(AgentId(2)).unwrap().action = Some(Action::Flee);
        let accountant = EpisodeAccountant::new(ScoringConfig::default());
        let surviving: HashSet<ThreatId> = [ThreatId(9)].into_iter().collect();
        let settlements = accountant.settle(&mut agents, &dyads, &surviving);

        let mut matrix = PayoffMatrix::default();
        let updates = accountant.apply_to_matrix(&mut matrix, &agents, &settlements);
        assert_eq!(updates, 1);
        let cell = matrix.cell(Action::Attack, Action::Flee);
        assert_eq!(cell.scores, [2.0, 2.0]);
        assert_eq!(cell.counts, [1, 1]);
        assert_eq!(matrix.cell(Action::Flee, Action::Attack).counts, [0, 0]);
    }
}
