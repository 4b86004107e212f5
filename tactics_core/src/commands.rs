use bevy::{math::Vec2, prelude::Resource};

use crate::{agents::AgentId, threat_field::ThreatId};

/// Order issued to a single friendly unit for the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandKind {
    /// Move towards a world-space point.
    MoveTo(Vec2),
    /// Engage the given threat.
    Attack(ThreatId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCommand {
    pub agent: AgentId,
    pub kind: CommandKind,
}

impl UnitCommand {
    pub fn move_to(agent: AgentId, target: Vec2) -> Self {
        Self {
            agent,
            kind: CommandKind::MoveTo(target),
        }
    }

    pub fn attack(agent: AgentId, threat: ThreatId) -> Self {
        Self {
            agent,
            kind: CommandKind::Attack(threat),
        }
    }
}

/// Commands produced during the current tick, drained by the caller after the
/// schedule runs.
#[derive(Resource, Debug, Clone, Default)]
pub struct CommandQueue {
    pending: Vec<UnitCommand>,
}

impl CommandQueue {
    pub fn push(&mut self, command: UnitCommand) {
        self.pending.push(command);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> Vec<UnitCommand> {
        std::mem::take(&mut self.pending)
    }
}
