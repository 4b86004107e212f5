//! Per-agent safety scoring derived from the current visibility mask.
//!
//! Each agent owns one [`SafetyGrid`]. The first observation seeds it with the
//! raw mask; every later observation re-scores the visible cells from the
//! density of safe neighbours in a square window, while cells outside vision
//! keep their remembered score.

use crate::{
    grid::{round_to, BoolGrid, Cell, GridDims, GridError},
    tactics_config::VisionConfig,
    terrain::TerrainModel,
};

/// Result of a single perception pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerceptOutcome {
    /// First observation: the grid was seeded from the mask.
    Bootstrapped,
    /// Later observation: `scored` passable cells and `blocked` impassable cells written.
    Scored { scored: usize, blocked: usize },
}

/// Persistent safety scores in `[0, 1]` for one agent.
///
/// Equality and cloning cover the scores only; the padded scratch buffer used
/// while scoring is not part of the grid's state.
#[derive(Debug)]
pub struct SafetyGrid {
    dims: GridDims,
    scores: Vec<f32>,
    working: Vec<f32>,
    bootstrapped: bool,
}

impl Clone for SafetyGrid {
    fn clone(&self) -> Self {
        Self {
            dims: self.dims,
            scores: self.scores.clone(),
            working: Vec::new(),
            bootstrapped: self.bootstrapped,
        }
    }
}

impl PartialEq for SafetyGrid {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims
            && self.bootstrapped == other.bootstrapped
            && self.scores == other.scores
    }
}

impl SafetyGrid {
    /// Empty grid awaiting its first observation.
    pub fn new(dims: GridDims) -> Self {
        Self {
            dims,
            scores: vec![0.0; dims.len()],
            working: Vec::new(),
            bootstrapped: false,
        }
    }

    /// Grid with explicit scores, treated as already bootstrapped.
    pub fn from_scores(dims: GridDims, scores: Vec<f32>) -> Result<Self, GridError> {
        if scores.len() != dims.len() {
            return Err(GridError::LengthMismatch {
                expected: dims.len(),
                found: scores.len(),
            });
        }
        Ok(Self {
            dims,
            scores,
            working: Vec::new(),
            bootstrapped: true,
        })
    }

    #[inline]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    pub fn score(&self, cell: Cell) -> f32 {
        self.dims
            .index(cell)
            .map(|idx| self.scores[idx])
            .unwrap_or(0.0)
    }

    #[inline]
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    #[inline]
    pub(crate) fn scores_mut(&mut self) -> &mut [f32] {
        &mut self.scores
    }

    /// Fold the current visibility mask into the stored scores.
    pub fn percept(
        &mut self,
        mask: &BoolGrid,
        terrain: &TerrainModel,
        config: &VisionConfig,
    ) -> Result<PerceptOutcome, GridError> {
        GridError::check_dims(self.dims, mask.dims())?;
        GridError::check_dims(self.dims, terrain.dims())?;

        if !self.bootstrapped {
            for (score, visible) in self.scores.iter_mut().zip(mask.as_slice()) {
                *score = if *visible { 1.0 } else { 0.0 };
            }
            self.bootstrapped = true;
            return Ok(PerceptOutcome::Bootstrapped);
        }

        let radius = config.neighborhood_radius as usize;
        let span = 2 * radius + 1;
        let rows = self.dims.rows as usize;
        let cols = self.dims.cols as usize;
        let padded_cols = cols + 2 * radius;
        let padded_rows = rows + 2 * radius;
        let visible = mask.as_slice();

        self.working.clear();
        self.working
            .resize(padded_rows * padded_cols, config.pad_value);
        for row in 0..rows {
            let src = row * cols;
            let dst = (row + radius) * padded_cols + radius;
            for col in 0..cols {
                let idx = src + col;
                self.working[dst + col] = if !visible[idx] {
                    self.scores[idx]
                } else if terrain.is_passable_index(idx) {
                    config.visible_marker
                } else {
                    0.0
                };
            }
        }

        let window = (span * span) as f32;
        let mut scored = 0;
        let mut blocked = 0;
        for (idx, _) in visible.iter().enumerate().filter(|(_, seen)| **seen) {
            if !terrain.is_passable_index(idx) {
                self.scores[idx] = 0.0;
                blocked += 1;
                continue;
            }
            let (row, col) = (idx / cols, idx % cols);
            // Padded coordinates shift by `radius`, so the window starts at (row, col).
            let mut valid = 0u32;
            for offset in 0..span {
                let start = (row + offset) * padded_cols + col;
                valid += self.working[start..start + span]
                    .iter()
                    .filter(|value| **value > config.valid_point_threshold)
                    .count() as u32;
            }
            self.scores[idx] = round_to(valid as f32 / window, config.score_precision);
            scored += 1;
        }

        Ok(PerceptOutcome::Scored { scored, blocked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_visible(dims: GridDims) -> BoolGrid {
        BoolGrid::filled(dims, true)
    }

    #[test]
    fn first_observation_copies_mask() {
        let dims = GridDims::new(3, 3);
        let mut mask = BoolGrid::new(dims);
        mask.set(Cell::new(1, 1), true);
        let mut grid = SafetyGrid::new(dims);

        let outcome = grid
            .percept(&mask, &TerrainModel::open(dims), &VisionConfig::default())
            .unwrap();

        assert_eq!(outcome, PerceptOutcome::Bootstrapped);
        assert_eq!(grid.score(Cell::new(1, 1)), 1.0);
        assert_eq!(grid.score(Cell::new(0, 0)), 0.0);
    }

    #[test]
    fn corner_cells_see_padding_as_unsafe() {
        let dims = GridDims::new(5, 5);
        let terrain = TerrainModel::open(dims);
        let config = VisionConfig::default();
        let mut grid = SafetyGrid::new(dims);
        grid.percept(&all_visible(dims), &terrain, &config).unwrap();
        grid.percept(&all_visible(dims), &terrain, &config).unwrap();

        // Corner window overlaps a 3x3 block of real cells.
        assert_eq!(grid.score(Cell::new(0, 0)), 0.36);
        assert_eq!(grid.score(Cell::new(2, 2)), 1.0);
        // Edge midpoint: 3 rows x 5 cols inside.
        assert_eq!(grid.score(Cell::new(0, 2)), 0.6);
    }

    #[test]
    fn unseen_cells_keep_memory() {
        let dims = GridDims::new(4, 4);
        let terrain = TerrainModel::open(dims);
        let config = VisionConfig::default();
        let remembered = vec![0.42; dims.len()];
        let mut grid = SafetyGrid::from_scores(dims, remembered).unwrap();

        let mut mask = BoolGrid::new(dims);
        mask.set(Cell::new(0, 0), true);
        grid.percept(&mask, &terrain, &config).unwrap();

        assert_eq!(grid.score(Cell::new(3, 3)), 0.42);
        assert_ne!(grid.score(Cell::new(0, 0)), 0.42);
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let dims = GridDims::new(4, 4);
        let mut grid = SafetyGrid::new(dims);
        let err = grid
            .percept(
                &BoolGrid::new(GridDims::new(3, 4)),
                &TerrainModel::open(dims),
                &VisionConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, GridError::DimensionMismatch { .. }));
        assert!(!grid.is_bootstrapped());
    }

    #[test]
    fn scratch_buffer_is_not_compared_or_cloned() {
        let dims = GridDims::new(5, 5);
        let terrain = TerrainModel::open(dims);
        let mask = all_visible(dims);
        let config = VisionConfig::default();

        let mut perceived = SafetyGrid::new(dims);
        perceived.percept(&mask, &terrain, &config).unwrap();
        perceived.percept(&mask, &terrain, &config).unwrap();
        assert!(!perceived.working.is_empty());

        let fresh = SafetyGrid::from_scores(dims, perceived.scores().to_vec()).unwrap();
        assert_eq!(fresh, perceived);

        let copy = perceived.clone();
        assert!(copy.working.is_empty());
        assert_eq!(copy, perceived);
    }
}
