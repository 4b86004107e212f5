//! Graduated danger rings applied to a safety grid around each known threat.

use std::fmt;

use bevy::math::Vec2;

use crate::{
    grid::{round_to, BoolGrid, GridDims},
    tactics_config::ThreatConfig,
    vision::SafetyGrid,
};

/// Identifier for a hostile unit reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreatId(pub u64);

impl fmt::Display for ThreatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-tick view of one threat, in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatDescriptor {
    pub id: ThreatId,
    pub position: Vec2,
    pub detection_radius: f32,
}

impl ThreatDescriptor {
    pub fn new(id: ThreatId, position: Vec2, detection_radius: f32) -> Self {
        Self {
            id,
            position,
            detection_radius,
        }
    }
}

/// Concentric disc masks around a threat, outer to inner.
#[derive(Debug, Clone)]
pub struct ThreatRings {
    pub masks: [BoolGrid; 3],
    pub multipliers: [f32; 3],
}

impl ThreatRings {
    pub fn around(threat: &ThreatDescriptor, dims: GridDims, config: &ThreatConfig) -> Self {
        let rounded = threat.position.round();
        let center = Vec2::new(rounded.x, dims.rows as f32 - rounded.y);
        let rings = config.rings();
        let masks = rings.map(|ring| {
            BoolGrid::disc(dims, center, threat.detection_radius - ring.offset)
        });
        Self {
            masks,
            multipliers: rings.map(|ring| ring.multiplier),
        }
    }
}

/// Multiply the grid by every ring of every threat, then round once.
///
/// Rings overlap, so a cell in the inner disc is scaled by all three
/// multipliers, and effects from several threats compound. An empty threat
/// list leaves the grid untouched.
pub fn apply_threats(grid: &mut SafetyGrid, threats: &[ThreatDescriptor], config: &ThreatConfig) {
    if threats.is_empty() {
        return;
    }

    let dims = grid.dims();
    for threat in threats {
        let rings = ThreatRings::around(threat, dims, config);
        let scores = grid.scores_mut();
        for (mask, multiplier) in rings.masks.iter().zip(rings.multipliers) {
            for (score, inside) in scores.iter_mut().zip(mask.as_slice()) {
                if *inside {
                    *score *= multiplier;
                }
            }
        }
    }

    for score in grid.scores_mut() {
        *score = round_to(*score, config.score_precision);
    }
}
