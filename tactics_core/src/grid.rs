//! Grid value types shared by the vision, threat and navigation passes.
//!
//! All grids are stored row-major. Row 0 is the top edge of the map, which is
//! the highest world `y`; conversion between the two uses the row-axis flip
//! `row = height - y`.

use bevy::math::Vec2;
use thiserror::Error;

/// Row/column address of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Fixed dimensions of every grid bound to one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridDims {
    pub rows: u32,
    pub cols: u32,
}

impl GridDims {
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// Flat index of a cell, if it lies inside the grid.
    #[inline]
    pub fn index(&self, cell: Cell) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.row as usize * self.cols as usize + cell.col as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn cell_at(&self, index: usize) -> Cell {
        let cols = self.cols.max(1) as usize;
        Cell::new((index / cols) as u32, (index % cols) as u32)
    }

    /// Continuous grid-space coordinates (`x` = column, `y` = row) of a world point.
    pub fn world_to_grid(&self, world: Vec2) -> Vec2 {
        Vec2::new(world.x, self.rows as f32 - world.y)
    }

    /// Cell containing a world point after rounding, or `None` when off the map.
    pub fn world_to_cell(&self, world: Vec2) -> Option<Cell> {
        let row = self.rows as f32 - world.y.round();
        let col = world.x.round();
        if row < 0.0 || col < 0.0 {
            return None;
        }
        let cell = Cell::new(row as u32, col as u32);
        self.contains(cell).then_some(cell)
    }

    /// World point addressed by a cell: `x = col`, `y = height - row`.
    pub fn cell_to_world(&self, cell: Cell) -> Vec2 {
        Vec2::new(cell.col as f32, self.rows as f32 - cell.row as f32)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("grid dimensions {found:?} do not match expected {expected:?}")]
    DimensionMismatch { expected: GridDims, found: GridDims },
    #[error("grid data holds {found} cells, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl GridError {
    pub(crate) fn check_dims(expected: GridDims, found: GridDims) -> Result<(), GridError> {
        if expected == found {
            Ok(())
        } else {
            Err(GridError::DimensionMismatch { expected, found })
        }
    }
}

/// Boolean grid used for visibility masks and threat discs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolGrid {
    dims: GridDims,
    cells: Vec<bool>,
}

impl BoolGrid {
    /// All-false grid.
    pub fn new(dims: GridDims) -> Self {
        Self::filled(dims, false)
    }

    pub fn filled(dims: GridDims, value: bool) -> Self {
        Self {
            dims,
            cells: vec![value; dims.len()],
        }
    }

    pub fn from_fn(dims: GridDims, mut f: impl FnMut(Cell) -> bool) -> Self {
        let cells = (0..dims.len()).map(|idx| f(dims.cell_at(idx))).collect();
        Self { dims, cells }
    }

    pub fn from_cells(dims: GridDims, cells: Vec<bool>) -> Result<Self, GridError> {
        if cells.len() != dims.len() {
            return Err(GridError::LengthMismatch {
                expected: dims.len(),
                found: cells.len(),
            });
        }
        Ok(Self { dims, cells })
    }

    /// Disc of cells whose centre lies within `radius` of `center`.
    ///
    /// `center` is in continuous grid space (`x` = column, `y` = row) and may
    /// fall outside the grid. Negative radii are clamped to zero.
    pub fn disc(dims: GridDims, center: Vec2, radius: f32) -> Self {
        let radius = radius.max(0.0);
        let radius_sq = radius * radius;
        Self::from_fn(dims, |cell| {
            let dx = cell.col as f32 - center.x;
            let dy = cell.row as f32 - center.y;
            dx * dx + dy * dy <= radius_sq
        })
    }

    #[inline]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    pub fn get(&self, cell: Cell) -> bool {
        self.dims
            .index(cell)
            .map(|idx| self.cells[idx])
            .unwrap_or(false)
    }

    #[inline]
    pub fn set(&mut self, cell: Cell, value: bool) {
        if let Some(idx) = self.dims.index(cell) {
            self.cells[idx] = value;
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[bool] {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|value| **value).count()
    }

    pub fn any(&self) -> bool {
        self.cells.iter().any(|value| *value)
    }

    pub fn union(&self, other: &BoolGrid) -> Result<BoolGrid, GridError> {
        self.zip_with(other, |a, b| a || b)
    }

    pub fn intersection(&self, other: &BoolGrid) -> Result<BoolGrid, GridError> {
        self.zip_with(other, |a, b| a && b)
    }

    /// In-place union, used when folding several masks together.
    pub fn union_with(&mut self, other: &BoolGrid) -> Result<(), GridError> {
        GridError::check_dims(self.dims, other.dims)?;
        for (lhs, rhs) in self.cells.iter_mut().zip(&other.cells) {
            *lhs |= *rhs;
        }
        Ok(())
    }

    /// Set cells in row-major order.
    pub fn iter_set(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, value)| **value)
            .map(move |(idx, _)| self.dims.cell_at(idx))
    }

    fn zip_with(&self, other: &BoolGrid, op: impl Fn(bool, bool) -> bool) -> Result<BoolGrid, GridError> {
        GridError::check_dims(self.dims, other.dims)?;
        let cells = self
            .cells
            .iter()
            .zip(&other.cells)
            .map(|(a, b)| op(*a, *b))
            .collect();
        Ok(BoolGrid {
            dims: self.dims,
            cells,
        })
    }
}

/// Round to a fixed number of decimal places.
#[inline]
pub fn round_to(value: f32, precision: u32) -> f32 {
    let scale = 10f32.powi(precision as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_and_cell_conversions_flip_rows() {
        let dims = GridDims::new(32, 40);
        let cell = Cell::new(2, 7);
        let world = dims.cell_to_world(cell);
        assert_eq!(world, Vec2::new(7.0, 30.0));
        assert_eq!(dims.world_to_cell(world), Some(cell));

        // y = 0 maps to row 32, one past the bottom edge.
        assert_eq!(dims.world_to_cell(Vec2::new(3.0, 0.0)), None);
        assert_eq!(dims.world_to_cell(Vec2::new(-1.0, 5.0)), None);
    }

    #[test]
    fn disc_includes_boundary_and_clamps_radius() {
        let dims = GridDims::new(9, 9);
        let disc = BoolGrid::disc(dims, Vec2::new(4.0, 4.0), 2.0);
        assert!(disc.get(Cell::new(4, 6)));
        assert!(disc.get(Cell::new(2, 4)));
        assert!(!disc.get(Cell::new(2, 6)));
        assert_eq!(disc.count(), 13);

        let point = BoolGrid::disc(dims, Vec2::new(4.0, 4.0), -3.0);
        assert_eq!(point.count(), 1);
        assert!(point.get(Cell::new(4, 4)));
    }

    #[test]
    fn set_operations_require_matching_dims() {
        let dims = GridDims::new(3, 3);
        let mut left = BoolGrid::new(dims);
        left.set(Cell::new(0, 0), true);
        let mut right = BoolGrid::new(dims);
        right.set(Cell::new(0, 0), true);
        right.set(Cell::new(2, 2), true);

        assert_eq!(left.union(&right).unwrap().count(), 2);
        assert_eq!(left.intersection(&right).unwrap().count(), 1);

        let other = BoolGrid::new(GridDims::new(2, 3));
        assert!(matches!(
            left.union(&other),
            Err(GridError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn iter_set_is_row_major() {
        let dims = GridDims::new(2, 2);
        let grid = BoolGrid::from_cells(dims, vec![false, true, true, false]).unwrap();
        let cells: Vec<Cell> = grid.iter_set().collect();
        assert_eq!(cells, vec![Cell::new(0, 1), Cell::new(1, 0)]);
    }
}
