use bevy::prelude::Resource;

use crate::grid::{Cell, GridDims, GridError};

/// Static passability grid bound once per episode.
///
/// A cell with passability `0.0` is impassable; any other value is walkable.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct TerrainModel {
    dims: GridDims,
    passability: Vec<f32>,
}

impl TerrainModel {
    pub fn new(dims: GridDims, passability: Vec<f32>) -> Result<Self, GridError> {
        if passability.len() != dims.len() {
            return Err(GridError::LengthMismatch {
                expected: dims.len(),
                found: passability.len(),
            });
        }
        Ok(Self { dims, passability })
    }

    /// Fully passable terrain.
    pub fn open(dims: GridDims) -> Self {
        Self {
            dims,
            passability: vec![1.0; dims.len()],
        }
    }

    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, GridError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut passability = Vec::with_capacity(rows.len() * width);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != width {
                return Err(GridError::RaggedRow {
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
            passability.extend_from_slice(values);
        }
        Ok(Self {
            dims: GridDims::new(rows.len() as u32, width as u32),
            passability,
        })
    }

    /// Return a copy with the given cells marked impassable.
    pub fn with_blocked(mut self, cells: impl IntoIterator<Item = Cell>) -> Self {
        for cell in cells {
            if let Some(idx) = self.dims.index(cell) {
                self.passability[idx] = 0.0;
            }
        }
        self
    }

    #[inline]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn passability(&self, cell: Cell) -> f32 {
        self.dims
            .index(cell)
            .map(|idx| self.passability[idx])
            .unwrap_or(0.0)
    }

    /// Off-grid cells are treated as impassable.
    #[inline]
    pub fn is_passable(&self, cell: Cell) -> bool {
        self.passability(cell) != 0.0
    }

    #[inline]
    pub(crate) fn is_passable_index(&self, index: usize) -> bool {
        self.passability.get(index).is_some_and(|value| *value != 0.0)
    }

    pub fn impassable_count(&self) -> usize {
        self.passability.iter().filter(|value| **value == 0.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_ragged_input() {
        let err = TerrainModel::from_rows(&[vec![1.0, 1.0], vec![1.0]]).unwrap_err();
        assert_eq!(
            err,
            GridError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn blocked_cells_are_impassable() {
        let terrain = TerrainModel::open(GridDims::new(4, 4))
            .with_blocked([Cell::new(1, 1), Cell::new(9, 9)]);
        assert!(!terrain.is_passable(Cell::new(1, 1)));
        assert!(terrain.is_passable(Cell::new(1, 2)));
        assert!(!terrain.is_passable(Cell::new(4, 0)));
        assert_eq!(terrain.impassable_count(), 1);
    }
}
