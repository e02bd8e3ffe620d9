//! Grid types for the partitioned torus.

use crate::error::ConfigError;
use crate::pattern::Pattern;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEAD: u8 = 0;
pub const ALIVE: u8 = 1;

/// Ghost rows around each partition (one above, one below).
pub const GHOST_ROWS: usize = 2;

/// Logical size of the whole torus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridDims {
    pub rows: usize,
    pub cols: usize,
}

impl GridDims {
    pub fn new(rows: usize, cols: usize) -> Result<Self, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::InvalidDimensions { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// Contiguous band of global rows `[start, start + len)` owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBand {
    pub start: usize,
    pub len: usize,
}

impl RowBand {
    /// Band of `rank` when `rows` are split across `workers`. The first
    /// `rows % workers` ranks take one extra row.
    pub fn for_rank(rank: usize, workers: usize, rows: usize) -> Self {
        let base = rows / workers;
        let extra = rows % workers;
        Self {
            start: rank * base + rank.min(extra),
            len: base + usize::from(rank < extra),
        }
    }

    /// Bands of every rank, in rank order.
    pub fn all(workers: usize, rows: usize) -> Vec<Self> {
        (0..workers)
            .map(|rank| Self::for_rank(rank, workers, rows))
            .collect()
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.start && row < self.end()
    }
}

/// One worker's slice of the torus plus a ghost row above and below.
///
/// Storage is row-major with `local_rows + 2` rows: index 0 is the top ghost,
/// `1..=local_rows` are owned rows, `local_rows + 1` is the bottom ghost.
#[derive(Debug, Clone)]
pub struct GridPartition {
    rank: usize,
    dims: GridDims,
    band: RowBand,
    cells: Vec<u8>,
    scratch: Vec<u8>,
}

impl GridPartition {
    /// Allocate the partition of `rank` and seed it from `pattern`, or with a
    /// uniform random fill when no pattern is given.
    pub fn new(
        rank: usize,
        workers: usize,
        dims: GridDims,
        pattern: Option<&Pattern>,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if workers > dims.rows {
            return Err(ConfigError::TooManyWorkers {
                workers,
                rows: dims.rows,
            });
        }
        if rank >= workers {
            return Err(ConfigError::RankOutOfRange { rank, workers });
        }

        let band = RowBand::for_rank(rank, workers, dims.rows);
        let len = (band.len + GHOST_ROWS) * dims.cols;
        let mut partition = Self {
            rank,
            dims,
            band,
            cells: vec![DEAD; len],
            scratch: vec![DEAD; len],
        };

        match pattern {
            Some(pattern) => partition.seed_pattern(pattern),
            None => partition.seed_random(seed),
        }
        Ok(partition)
    }

    fn seed_pattern(&mut self, pattern: &Pattern) {
        for &(row, col) in &pattern.cells {
            // Cells outside this band belong to another worker.
            if self.band.contains(row) && col < self.dims.cols {
                let local = row - self.band.start + 1;
                self.cells[local * self.dims.cols + col] = ALIVE;
            }
        }
    }

    fn seed_random(&mut self, seed: Option<u64>) {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.rank as u64)),
            None => StdRng::from_entropy(),
        };
        let cols = self.dims.cols;
        for cell in &mut self.cells[cols..(self.band.len + 1) * cols] {
            *cell = u8::from(rng.gen_bool(0.5));
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn band(&self) -> RowBand {
        self.band
    }

    pub fn start_loc(&self) -> usize {
        self.band.start
    }

    pub fn local_rows(&self) -> usize {
        self.band.len
    }

    pub fn cols(&self) -> usize {
        self.dims.cols
    }

    /// Row by local index, ghost rows included.
    pub fn row(&self, local_row: usize) -> &[u8] {
        let cols = self.dims.cols;
        &self.cells[local_row * cols..(local_row + 1) * cols]
    }

    pub fn is_alive(&self, local_row: usize, col: usize) -> bool {
        self.cells[local_row * self.dims.cols + col] == ALIVE
    }

    pub fn first_row(&self) -> &[u8] {
        self.row(1)
    }

    pub fn last_row(&self) -> &[u8] {
        self.row(self.band.len)
    }

    pub fn top_ghost(&self) -> &[u8] {
        self.row(0)
    }

    pub fn bottom_ghost(&self) -> &[u8] {
        self.row(self.band.len + 1)
    }

    pub(crate) fn set_top_ghost(&mut self, row: &[u8]) {
        let cols = self.dims.cols;
        self.cells[..cols].copy_from_slice(row);
    }

    pub(crate) fn set_bottom_ghost(&mut self, row: &[u8]) {
        let cols = self.dims.cols;
        let start = (self.band.len + 1) * cols;
        self.cells[start..start + cols].copy_from_slice(row);
    }

    /// Owned rows only, contiguous and row-major.
    pub fn live_cells(&self) -> &[u8] {
        let cols = self.dims.cols;
        &self.cells[cols..(self.band.len + 1) * cols]
    }

    /// Current cells and the scratch buffer for the next generation.
    pub(crate) fn buffers(&mut self) -> (&[u8], &mut [u8]) {
        (self.cells.as_slice(), self.scratch.as_mut_slice())
    }

    /// Make the scratch buffer current.
    pub(crate) fn commit(&mut self) {
        std::mem::swap(&mut self.cells, &mut self.scratch);
    }
}

/// Snapshot of the whole torus, row-major, `rows * cols` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalGrid {
    dims: GridDims,
    cells: Vec<u8>,
}

impl GlobalGrid {
    /// Wrap gathered cells. Returns `None` when the length does not match.
    pub fn from_cells(dims: GridDims, cells: Vec<u8>) -> Option<Self> {
        (cells.len() == dims.cell_count()).then_some(Self { dims, cells })
    }

    /// Grid with only the in-range pattern cells alive.
    pub fn from_pattern(pattern: &Pattern) -> Self {
        let dims = pattern.dims;
        let mut cells = vec![DEAD; dims.cell_count()];
        for &(row, col) in &pattern.cells {
            if row < dims.rows && col < dims.cols {
                cells[row * dims.cols + col] = ALIVE;
            }
        }
        Self { dims, cells }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn is_alive(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.dims.cols + col] == ALIVE
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == ALIVE).count()
    }

    /// Coordinates of live cells in row-major order.
    pub fn live_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &cell)| cell == ALIVE)
            .map(|(index, _)| (index / self.dims.cols, index % self.dims.cols))
            .collect()
    }

    /// One line per row, `#` alive, `.` dead.
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.cells.len() + self.dims.rows);
        for row in self.cells.chunks(self.dims.cols) {
            text.extend(row.iter().map(|&cell| if cell == ALIVE { '#' } else { '.' }));
            text.push('\n');
        }
        text
    }
}
