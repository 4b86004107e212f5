use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::{
    accountant::EpisodeAccountant,
    agents::{AgentRecord, AgentTable},
    commands::{CommandQueue, UnitCommand},
    dyad::DyadRegistry,
    grid::{BoolGrid, GridDims},
    host::HostFrame,
    navigator::select_target,
    payoff::{Action, PayoffMatrix},
    resources::EpisodeClock,
    strategy::decide,
    tactics_config::TacticsConfigHandle,
    terrain::TerrainModel,
    threat_field::{apply_threats, ThreatDescriptor, ThreatId},
};

/// Read-only inputs shared by the perception systems.
#[derive(SystemParam)]
pub struct TickInputs<'w> {
    pub frame: Res<'w, HostFrame>,
    pub terrain: Res<'w, TerrainModel>,
    pub config: Res<'w, TacticsConfigHandle>,
}

/// Register new agents from the first frame and retire agents the host no
/// longer reports.
pub fn sync_agents(
    frame: Res<HostFrame>,
    clock: Res<EpisodeClock>,
    terrain: Res<TerrainModel>,
    mut agents: ResMut<AgentTable>,
) {
    for observation in &frame.agents {
        if let Some(record) = agents.get_mut(observation.id) {
            if record.alive {
                record.position = observation.position;
            }
            continue;
        }
        if clock.tick > 0 {
            tracing::warn!(
                target: "squad_tactics::agents",
                agent = %observation.id,
                tick = frame.tick,
                "agent.ignored=late_arrival"
            );
            continue;
        }
        agents.insert(AgentRecord::new(
            observation.id,
            observation.position,
            observation.strategy,
            terrain.dims(),
        ));
        tracing::debug!(
            target: "squad_tactics::agents",
            agent = %observation.id,
            strategy = %observation.strategy,
            "agent.registered"
        );
    }

    retire_absent_agents(&frame, &mut agents);
}

/// Mark every live agent missing from `frame` as dead. Returns how many died.
pub fn retire_absent_agents(frame: &HostFrame, agents: &mut AgentTable) -> usize {
    let vanished: Vec<_> = agents
        .alive()
        .filter(|record| frame.agent(record.id).is_none())
        .map(|record| record.id)
        .collect();
    for id in &vanished {
        if agents.mark_dead(*id) {
            tracing::info!(
                target: "squad_tactics::agents",
                agent = %id,
                tick = frame.tick,
                "agent.died"
            );
        }
    }
    vanished.len()
}

pub fn perceive_environment(inputs: TickInputs, mut agents: ResMut<AgentTable>) {
    let config = inputs.config.get();
    let vision = &config.vision;
    for record in agents.iter_mut().filter(|record| record.alive) {
        let Some(observation) = inputs.frame.agent(record.id) else {
            continue;
        };
        match record
            .safety
            .percept(&observation.visibility, &inputs.terrain, vision)
        {
            Ok(outcome) => tracing::trace!(
                target: "squad_tactics::vision",
                agent = %record.id,
                ?outcome,
                "vision.percept"
            ),
            Err(err) => tracing::warn!(
                target: "squad_tactics::vision",
                agent = %record.id,
                error = %err,
                "vision.skipped=invalid_mask"
            ),
        }
    }
}

pub fn apply_threat_fields(inputs: TickInputs, mut agents: ResMut<AgentTable>) {
    let config = inputs.config.get();
    let threat_config = &config.threat;
    for record in agents.iter_mut().filter(|record| record.alive) {
        let Some(observation) = inputs.frame.agent(record.id) else {
            continue;
        };
        let visible = visible_threats(&inputs.frame.threats, &observation.visibility, None);
        apply_threats(&mut record.safety, &visible, threat_config);
    }
}

pub fn form_dyads(
    frame: Res<HostFrame>,
    mut agents: ResMut<AgentTable>,
    mut dyads: ResMut<DyadRegistry>,
) {
    dyads.form(&mut agents, &frame.threats, frame.tick);
}

/// Fix the episode action of every dyad member that has not decided yet.
pub fn decide_actions(
    matrix: Res<PayoffMatrix>,
    dyads: Res<DyadRegistry>,
    mut agents: ResMut<AgentTable>,
) {
    for dyad in dyads.dyads() {
        for id in dyad.members() {
            let Some(record) = agents.get_mut(id) else {
                continue;
            };
            if record.action.is_some() {
                continue;
            }
            let decision = decide(record.strategy, &matrix);
            record.action = Some(decision.action);
            tracing::debug!(
                target: "squad_tactics::strategy",
                agent = %id,
                strategy = %record.strategy,
                action = %decision.action,
                basis = ?decision.rational,
                "strategy.decided"
            );
        }
    }
}

/// Attack the dyad's threat when committed to it, otherwise move to the safest
/// visible cell while any threat is in sight.
pub fn emit_commands(
    frame: Res<HostFrame>,
    dyads: Res<DyadRegistry>,
    agents: Res<AgentTable>,
    mut queue: ResMut<CommandQueue>,
) {
    for record in agents.alive() {
        let Some(observation) = frame.agent(record.id) else {
            continue;
        };
        let engaged = dyads
            .for_agent(record.id)
            .map(|dyad| dyad.threat)
            .filter(|threat| frame.threats.iter().any(|t| t.id == *threat));

        if let (Some(threat), Some(Action::Attack)) = (engaged, record.action) {
            queue.push(UnitCommand::attack(record.id, threat));
            continue;
        }

        let threats = visible_threats(&frame.threats, &observation.visibility, engaged);
        if threats.is_empty() {
            continue;
        }
        match select_target(&record.safety, &observation.visibility, &threats) {
            Ok(Some(target)) => {
                tracing::trace!(
                    target: "squad_tactics::navigator",
                    agent = %record.id,
                    row = target.cell.row,
                    col = target.cell.col,
                    score = target.score,
                    "navigator.target"
                );
                queue.push(UnitCommand::move_to(record.id, target.world));
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(
                target: "squad_tactics::navigator",
                agent = %record.id,
                error = %err,
                "navigator.skipped=invalid_mask"
            ),
        }
    }
}

pub fn accrue_tick_scores(
    mut accountant: ResMut<EpisodeAccountant>,
    mut agents: ResMut<AgentTable>,
    dyads: Res<DyadRegistry>,
) {
    let credited = accountant.accrue_tick(&mut agents, &dyads);
    tracing::trace!(target: "squad_tactics::accounting", credited, "accounting.tick");
}

pub fn advance_clock(mut clock: ResMut<EpisodeClock>) {
    clock.tick += 1;
}

/// Threats whose position falls on a cell of `mask`, with `primary` first
/// when it is among them.
pub fn visible_threats(
    threats: &[ThreatDescriptor],
    mask: &BoolGrid,
    primary: Option<ThreatId>,
) -> Vec<ThreatDescriptor> {
    let dims: GridDims = mask.dims();
    let mut visible: Vec<ThreatDescriptor> = threats
        .iter()
        .filter(|threat| {
            dims.world_to_cell(threat.position)
                .is_some_and(|cell| mask.get(cell))
        })
        .cloned()
        .collect();
    if let Some(primary) = primary {
        if let Some(idx) = visible.iter().position(|threat| threat.id == primary) {
            let threat = visible.remove(idx);
            visible.insert(0, threat);
        }
    }
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;

    #[test]
    fn primary_threat_is_moved_to_the_front() {
        let dims = GridDims::new(8, 8);
        let mask = BoolGrid::filled(dims, true);
        let threats = vec![
            ThreatDescriptor::new(ThreatId(1), Vec2::new(1.0, 1.0), 4.0),
            ThreatDescriptor::new(ThreatId(2), Vec2::new(2.0, 2.0), 4.0),
        ];
        let ordered = visible_threats(&threats, &mask, Some(ThreatId(2)));
        assert_eq!(ordered[0].id, ThreatId(2));
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn hidden_threats_are_filtered() {
        let dims = GridDims::new(8, 8);
        let mut mask = BoolGrid::new(dims);
        // World (3, 5) lands on row 8 - 5 = 3, col 3.
        mask.set(Cell::new(3, 3), true);
        let threats = vec![
            ThreatDescriptor::new(ThreatId(1), Vec2::new(3.0, 5.0), 4.0),
            ThreatDescriptor::new(ThreatId(2), Vec2::new(6.0, 6.0), 4.0),
        ];
        let visible = visible_threats(&threats, &mask, None);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, ThreatId(1));
    }
}
