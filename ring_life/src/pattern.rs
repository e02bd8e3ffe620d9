//! Initial live-cell patterns.

use crate::error::ConfigError;
use crate::grid::GridDims;

/// Absolute coordinates of initially alive cells, together with the grid
/// dimensions they were authored for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub dims: GridDims,
    pub cells: Vec<(usize, usize)>,
}

impl Pattern {
    pub fn new(dims: GridDims, cells: Vec<(usize, usize)>) -> Self {
        Self { dims, cells }
    }

    /// Coordinates that fall outside the authored grid. Partitions ignore
    /// them when seeding.
    pub fn out_of_range(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .copied()
            .filter(|&(row, col)| row >= self.dims.rows || col >= self.dims.cols)
            .collect()
    }

    /// Check the pattern was authored for `dims`.
    pub fn check_dims(&self, dims: GridDims) -> Result<(), ConfigError> {
        if self.dims == dims {
            Ok(())
        } else {
            Err(ConfigError::PatternMismatch {
                pattern_rows: self.dims.rows,
                pattern_cols: self.dims.cols,
                rows: dims.rows,
                cols: dims.cols,
            })
        }
    }
}
