//! Deterministic headless skirmish used to exercise the tactics layer without
//! an external simulation.
//!
//! Friendly units spawn in the lower half of an open map dotted with pillars;
//! threats spawn in the upper half, chase the nearest unit inside their
//! detection radius and detonate on contact, killing every unit within the
//! blast radius. Units die when they vanish from the frame, threats die when
//! their health runs out or they detonate. All randomness comes from a
//! seeded `ChaCha8Rng`, so equal configs replay identically.

use bevy::math::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    agents::AgentId,
    commands::{CommandKind, UnitCommand},
    grid::{BoolGrid, Cell, GridDims},
    host::{AgentObservation, HostFrame, TacticalHost},
    strategy::StrategyType,
    terrain::TerrainModel,
    threat_field::{ThreatDescriptor, ThreatId},
};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArenaConfig {
    pub rows: u32,
    pub cols: u32,
    /// Strategy of each friendly unit, in id order starting at 1.
    pub roster: Vec<StrategyType>,
    pub threats: u32,
    pub sight_range: f32,
    pub detection_radius: f32,
    pub unit_speed: f32,
    pub threat_speed: f32,
    pub attack_range: f32,
    pub attack_damage: f32,
    pub threat_health: f32,
    /// Distance at which a threat detonates.
    pub contact_range: f32,
    pub blast_radius: f32,
    pub pillars: u32,
    pub seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            rows: 32,
            cols: 32,
            roster: vec![
                StrategyType::Rational,
                StrategyType::Rational,
                StrategyType::Greedy,
                StrategyType::Attacker,
                StrategyType::Runner,
                StrategyType::Altruistic,
            ],
            threats: 2,
            sight_range: 9.0,
            detection_radius: 8.0,
            unit_speed: 1.0,
            threat_speed: 0.6,
            attack_range: 2.5,
            attack_damage: 1.0,
            threat_health: 6.0,
            contact_range: 1.0,
            blast_radius: 1.5,
            pillars: 12,
            seed: 7,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArenaError {
    #[error("arena must be at least 8x8, got {rows}x{cols}")]
    TooSmall { rows: u32, cols: u32 },
    #[error("arena roster is empty")]
    EmptyRoster,
    #[error("command addressed to unknown unit {0}")]
    UnknownUnit(AgentId),
}

#[derive(Debug, Clone)]
struct ArenaUnit {
    id: AgentId,
    strategy: StrategyType,
    position: Vec2,
    alive: bool,
}

#[derive(Debug, Clone)]
struct ArenaThreat {
    id: ThreatId,
    position: Vec2,
    health: f32,
    alive: bool,
}

/// Self-contained [`TacticalHost`] with simple chase-and-detonate threats.
#[derive(Debug, Clone)]
pub struct ArenaHost {
    config: ArenaConfig,
    terrain: TerrainModel,
    units: Vec<ArenaUnit>,
    threats: Vec<ArenaThreat>,
    rng: ChaCha8Rng,
    tick: u64,
}

impl ArenaHost {
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        if config.rows < 8 || config.cols < 8 {
            return Err(ArenaError::TooSmall {
                rows: config.rows,
                cols: config.cols,
            });
        }
        if config.roster.is_empty() {
            return Err(ArenaError::EmptyRoster);
        }

        let dims = GridDims::new(config.rows, config.cols);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let pillars: Vec<Cell> = (0..config.pillars)
            .map(|_| Cell::new(rng.gen_range(1..dims.rows - 1), rng.gen_range(1..dims.cols - 1)))
            .collect();
        let terrain = TerrainModel::open(dims).with_blocked(pillars);

        let half = config.rows as f32 / 2.0;
        let units = config
            .roster
            .iter()
            .enumerate()
            .map(|(idx, strategy)| ArenaUnit {
                id: AgentId(idx as u64 + 1),
                strategy: *strategy,
                position: spawn_point(&mut rng, &terrain, 2.0, half),
                alive: true,
            })
            .collect();
        let threats = (0..config.threats)
            .map(|idx| ArenaThreat {
                id: ThreatId(idx as u64 + 100),
                position: spawn_point(&mut rng, &terrain, half + 2.0, config.rows as f32 - 1.0),
                health: config.threat_health,
                alive: true,
            })
            .collect();

        tracing::debug!(
            target: "squad_tactics::arena",
            rows = config.rows,
            cols = config.cols,
            units = config.roster.len(),
            threats = config.threats,
            seed = config.seed,
            "arena.spawned"
        );

        Ok(Self {
            config,
            terrain,
            units,
            threats,
            rng,
            tick: 0,
        })
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn live_units(&self) -> usize {
        self.units.iter().filter(|unit| unit.alive).count()
    }

    pub fn live_threats(&self) -> usize {
        self.threats.iter().filter(|threat| threat.alive).count()
    }

    fn dims(&self) -> GridDims {
        self.terrain.dims()
    }

    /// Move `from` towards `to` by at most `speed`, staying on passable cells.
    fn step(&self, from: Vec2, to: Vec2, speed: f32) -> Vec2 {
        let delta = to - from;
        let distance = delta.length();
        if distance <= f32::EPSILON {
            return from;
        }
        let next = from + delta * (speed.min(distance) / distance);
        let dims = self.dims();
        let clamped = Vec2::new(
            next.x.clamp(0.0, (dims.cols - 1) as f32),
            next.y.clamp(1.0, dims.rows as f32),
        );
        match dims.world_to_cell(clamped) {
            Some(cell) if self.terrain.is_passable(cell) => clamped,
            _ => from,
        }
    }

    fn resolve_unit_command(&mut self, command: &UnitCommand) -> Result<(), ArenaError> {
        let idx = self
            .units
            .iter()
            .position(|unit| unit.id == command.agent)
            .ok_or(ArenaError::UnknownUnit(command.agent))?;
        if !self.units[idx].alive {
            return Ok(());
        }
        let position = self.units[idx].position;
        match command.kind {
            CommandKind::MoveTo(target) => {
                self.units[idx].position = self.step(position, target, self.config.unit_speed);
            }
            CommandKind::Attack(threat_id) => {
                let Some(t_idx) = self
                    .threats
                    .iter()
                    .position(|threat| threat.id == threat_id && threat.alive)
                else {
                    return Ok(());
                };
                let target = self.threats[t_idx].position;
                if position.distance(target) <= self.config.attack_range {
                    let threat = &mut self.threats[t_idx];
                    threat.health -= self.config.attack_damage;
                    if threat.health <= 0.0 {
                        threat.alive = false;
                        tracing::debug!(
                            target: "squad_tactics::arena",
                            threat = %threat_id,
                            by = %command.agent,
                            "arena.threat_destroyed"
                        );
                    }
                } else {
                    self.units[idx].position =
                        self.step(position, target, self.config.unit_speed);
                }
            }
        }
        Ok(())
    }

    fn advance_threats(&mut self) {
        for t_idx in 0..self.threats.len() {
            if !self.threats[t_idx].alive {
                continue;
            }
            let position = self.threats[t_idx].position;
            let prey = self
                .units
                .iter()
                .filter(|unit| unit.alive)
                .map(|unit| (unit.position.distance(position), unit.position))
                .filter(|(distance, _)| *distance <= self.config.detection_radius)
                .min_by(|a, b| a.0.total_cmp(&b.0));

            let target = match prey {
                Some((_, target)) => target,
                None => {
                    let jitter = Vec2::new(self.rng.gen_range(-1.0..=1.0), self.rng.gen_range(-1.0..=1.0));
                    position + jitter
                }
            };
            let next = self.step(position, target, self.config.threat_speed);
            self.threats[t_idx].position = next;

            let contact = self
                .units
                .iter()
                .any(|unit| unit.alive && unit.position.distance(next) <= self.config.contact_range);
            if contact {
                self.detonate(t_idx);
            }
        }
    }

    fn detonate(&mut self, t_idx: usize) {
        let threat = &mut self.threats[t_idx];
        threat.alive = false;
        let center = threat.position;
        let threat_id = threat.id;
        let mut casualties = 0;
        for unit in self.units.iter_mut().filter(|unit| unit.alive) {
            if unit.position.distance(center) <= self.config.blast_radius {
                unit.alive = false;
                casualties += 1;
            }
        }
        tracing::debug!(
            target: "squad_tactics::arena",
            threat = %threat_id,
            casualties,
            tick = self.tick,
            "arena.detonation"
        );
    }
}

impl TacticalHost for ArenaHost {
    type Error = ArenaError;

    fn terrain(&self) -> TerrainModel {
        self.terrain.clone()
    }

    fn observe(&mut self, tick: u64) -> Result<HostFrame, Self::Error> {
        self.tick = tick;
        let dims = self.dims();
        let agents = self
            .units
            .iter()
            .filter(|unit| unit.alive)
            .map(|unit| AgentObservation {
                id: unit.id,
                position: unit.position,
                strategy: unit.strategy,
                visibility: BoolGrid::disc(
                    dims,
                    dims.world_to_grid(unit.position),
                    self.config.sight_range,
                ),
            })
            .collect();
        let threats = self
            .threats
            .iter()
            .filter(|threat| threat.alive)
            .map(|threat| {
                ThreatDescriptor::new(threat.id, threat.position, self.config.detection_radius)
            })
            .collect();
        Ok(HostFrame {
            tick,
            agents,
            threats,
        })
    }

    fn execute(&mut self, commands: &[UnitCommand]) -> Result<(), Self::Error> {
        for command in commands {
            self.resolve_unit_command(command)?;
        }
        self.advance_threats();
        Ok(())
    }
}

/// Random passable point with `y` in `[y_min, y_max)`.
fn spawn_point(rng: &mut ChaCha8Rng, terrain: &TerrainModel, y_min: f32, y_max: f32) -> Vec2 {
    let dims = terrain.dims();
    let x_max = (dims.cols - 1) as f32;
    let mut point = Vec2::new(1.0, y_min);
    for _ in 0..64 {
        point = Vec2::new(rng.gen_range(1.0..x_max).round(), rng.gen_range(y_min..y_max).round());
        if dims
            .world_to_cell(point)
            .is_some_and(|cell| terrain.is_passable(cell))
        {
            break;
        }
    }
    point
}
