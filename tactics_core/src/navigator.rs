//! Move-target selection over the visible part of a safety grid.

use bevy::math::Vec2;

use crate::{
    grid::{BoolGrid, Cell, GridError},
    threat_field::ThreatDescriptor,
    vision::SafetyGrid,
};

/// Cell picked by [`select_target`], with its world-space counterpart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationTarget {
    pub cell: Cell,
    pub world: Vec2,
    pub score: f32,
    /// Distance of the chosen cell from `threats[0]`, zero without threats.
    /// Not the farthest distance seen during the scan.
    pub threat_distance: f32,
}

/// Pick a move target among the cells under `mask`.
///
/// Cells are scanned row-major. A candidate replaces the running best whenever
/// its score is greater than or equal to the best so far, whether or not it is
/// farther from `threats[0]`; a later equal-score cell overwrites the pick even
/// when it is closer to the threat. The result is the last maximal-score cell
/// in scan order. Returns `None` when nothing is visible.
pub fn select_target(
    grid: &SafetyGrid,
    mask: &BoolGrid,
    threats: &[ThreatDescriptor],
) -> Result<Option<NavigationTarget>, GridError> {
    let dims = grid.dims();
    GridError::check_dims(dims, mask.dims())?;

    let primary = threats.first().map(|threat| threat.position);
    let mut best: Option<NavigationTarget> = None;
    let mut best_score = 0.0f32;

    for cell in mask.iter_set() {
        let score = grid.score(cell);
        if score < best_score {
            continue;
        }
        let world = dims.cell_to_world(cell);
        let threat_distance = primary.map(|pos| pos.distance(world)).unwrap_or(0.0);
        best_score = score;
        best = Some(NavigationTarget {
            cell,
            world,
            score,
            threat_distance,
        });
    }

    Ok(best)
}
