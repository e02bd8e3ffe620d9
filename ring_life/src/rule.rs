//! Conway's rule on one partition.
//!
//! Rows read their vertical neighbours from the ghost rows, which the halo
//! exchange filled from the adjacent partitions (the first and last
//! partitions are adjacent across the seam of the torus). Columns wrap
//! explicitly.

use crate::grid::{ALIVE, DEAD, GridPartition};

/// Next state of a cell given its current state and live neighbour count.
pub fn next_state(alive: bool, neighbours: u8) -> bool {
    match (alive, neighbours) {
        (true, 2) | (true, 3) => true, // Survival
        (false, 3) => true,            // Birth
        _ => false,                    // Death or stays dead
    }
}

/// Advance `partition` by one generation.
///
/// Counts are taken from the current buffer only; results go to the scratch
/// buffer, which becomes current once every cell is done.
pub fn step(partition: &mut GridPartition) {
    let cols = partition.cols();
    let local_rows = partition.local_rows();
    let (current, next) = partition.buffers();

    // Ghost rows carry over untouched until the next exchange.
    next[..cols].copy_from_slice(&current[..cols]);
    let bottom = (local_rows + 1) * cols;
    next[bottom..bottom + cols].copy_from_slice(&current[bottom..bottom + cols]);

    for row in 1..=local_rows {
        for col in 0..cols {
            let mut count = 0u8;
            for dr in 0..3 {
                let base = (row + dr - 1) * cols;
                for dc in 0..3 {
                    if dr == 1 && dc == 1 {
                        continue;
                    }
                    count += current[base + (col + cols + dc - 1) % cols];
                }
            }

            let index = row * cols + col;
            next[index] = if next_state(current[index] == ALIVE, count) {
                ALIVE
            } else {
                DEAD
            };
        }
    }

    partition.commit();
}
