//! End-to-end properties of a running compute group.
//!
//! Each test starts real worker tasks that talk only through the transport,
//! then checks the gathered grid.

use ring_life::rule::next_state;
use ring_life::{
    CommError, ComputeGroup, GlobalGrid, GridDims, LifeError, Pattern, SimConfig, run_detached,
};
use std::collections::BTreeSet;
use tokio::runtime::Handle;

fn dims(rows: usize, cols: usize) -> GridDims {
    GridDims::new(rows, cols).unwrap()
}

/// Single-buffer torus step over the whole grid, no partitions involved.
fn reference_step(grid: &GlobalGrid) -> GlobalGrid {
    let GridDims { rows, cols } = grid.dims();
    let mut next = vec![0u8; rows * cols];
    for row in 0..rows {
        for col in 0..cols {
            let mut count = 0;
            for dr in [rows - 1, 0, 1] {
                for dc in [cols - 1, 0, 1] {
                    if (dr, dc) == (0, 0) {
                        continue;
                    }
                    count += u8::from(grid.is_alive((row + dr) % rows, (col + dc) % cols));
                }
            }
            next[row * cols + col] = u8::from(next_state(grid.is_alive(row, col), count));
        }
    }
    GlobalGrid::from_cells(grid.dims(), next).unwrap()
}

/// Roughly one in three cells alive, from a fixed linear congruential stream.
fn soup(grid_dims: GridDims, seed: u64) -> Pattern {
    let mut state = seed;
    let mut cells = Vec::new();
    for row in 0..grid_dims.rows {
        for col in 0..grid_dims.cols {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            if (state >> 16) % 3 == 0 {
                cells.push((row, col));
            }
        }
    }
    Pattern::new(grid_dims, cells)
}

fn shifted(cells: &[(usize, usize)], by: (usize, usize), grid_dims: GridDims) -> BTreeSet<(usize, usize)> {
    cells
        .iter()
        .map(|&(r, c)| ((r + by.0) % grid_dims.rows, (c + by.1) % grid_dims.cols))
        .collect()
}

async fn run(pattern: &Pattern, workers: usize, generations: u64) -> GlobalGrid {
    let config = SimConfig::new(pattern.dims)
        .with_workers(workers)
        .with_max_generations(generations);
    let report = run_detached(&config, Some(pattern)).await.unwrap();
    assert_eq!(report.generations, generations);
    report.snapshot
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_partitioning_does_not_change_outcome() {
    let grid_dims = dims(13, 11);
    let pattern = soup(grid_dims, 2024);

    for generations in [0, 1, 5, 17] {
        let single = run(&pattern, 1, generations).await;

        let mut expected = GlobalGrid::from_pattern(&pattern);
        for _ in 0..generations {
            expected = reference_step(&expected);
        }
        assert_eq!(single, expected, "single worker diverged after {generations} generations");

        for workers in 2..=6 {
            let split = run(&pattern, workers, generations).await;
            assert_eq!(
                split, single,
                "{workers} workers diverged after {generations} generations"
            );
        }
    }
}

#[tokio::test]
async fn test_every_row_its_own_partition() {
    let grid_dims = dims(7, 9);
    let pattern = soup(grid_dims, 99);
    let single = run(&pattern, 1, 9).await;
    let split = run(&pattern, 7, 9).await;
    assert_eq!(split, single);
}

#[tokio::test]
async fn test_corners_are_diagonal_neighbours() {
    // Three corners of the torus: the fourth is born from its diagonal.
    let grid_dims = dims(6, 7);
    let pattern = Pattern::new(grid_dims, vec![(0, 6), (5, 0), (5, 6)]);

    let grid = run(&pattern, 3, 1).await;
    assert_eq!(grid.live_cells(), vec![(0, 0), (0, 6), (5, 0), (5, 6)]);
}

#[tokio::test]
async fn test_block_is_still() {
    // Straddles the boundary between the two partitions.
    let grid_dims = dims(8, 8);
    let block = vec![(3, 3), (3, 4), (4, 3), (4, 4)];
    let pattern = Pattern::new(grid_dims, block.clone());

    for generations in [1, 2, 10] {
        let grid = run(&pattern, 2, generations).await;
        assert_eq!(grid.live_cells(), block);
    }
}

#[tokio::test]
async fn test_blinker_has_period_two() {
    let grid_dims = dims(6, 6);
    let horizontal = vec![(2, 1), (2, 2), (2, 3)];
    let pattern = Pattern::new(grid_dims, horizontal.clone());

    let once = run(&pattern, 3, 1).await;
    assert_eq!(once.live_cells(), vec![(1, 2), (2, 2), (3, 2)]);

    let twice = run(&pattern, 3, 2).await;
    assert_eq!(twice.live_cells(), horizontal);
}

#[tokio::test]
async fn test_glider_moves_one_diagonal_every_four_generations() {
    let grid_dims = dims(12, 10);
    let glider = shifted(&[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)], (4, 3), grid_dims);
    let start: Vec<_> = glider.iter().copied().collect();
    let pattern = Pattern::new(grid_dims, start.clone());

    let grid = run(&pattern, 4, 4).await;
    let moved: BTreeSet<_> = grid.live_cells().into_iter().collect();
    assert_eq!(moved, shifted(&start, (1, 1), grid_dims));
}

#[tokio::test]
async fn test_glider_wraps_around_the_torus() {
    // Starts across the top/bottom seam; after 4 * 8 generations it has
    // travelled once around both axes.
    let grid_dims = dims(8, 8);
    let start: Vec<_> = shifted(&[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)], (6, 6), grid_dims)
        .into_iter()
        .collect();
    let pattern = Pattern::new(grid_dims, start.clone());

    let grid = run(&pattern, 3, 32).await;
    let back: BTreeSet<_> = grid.live_cells().into_iter().collect();
    assert_eq!(back, start.into_iter().collect());
}

#[tokio::test]
async fn test_gathered_grid_is_complete_for_random_fill() {
    let grid_dims = dims(17, 5);
    for workers in [1, 2, 4, 5, 17] {
        let config = SimConfig::new(grid_dims)
            .with_workers(workers)
            .with_max_generations(3)
            .with_seed(11);
        let report = run_detached(&config, None).await.unwrap();
        assert_eq!(report.snapshot.cells().len(), 17 * 5);
        assert!(report.snapshot.cells().iter().all(|&cell| cell <= 1));
    }
}

#[tokio::test]
async fn test_each_request_gets_exactly_one_frame() {
    let grid_dims = dims(8, 8);
    let block = vec![(0, 0), (0, 1), (1, 0), (1, 1)];
    let pattern = Pattern::new(grid_dims, block.clone());
    let config = SimConfig::new(grid_dims).with_workers(3);

    let (group, mut display) = ComputeGroup::spawn(&Handle::current(), &config, Some(&pattern)).unwrap();
    assert_eq!(group.workers(), 3);

    let frames = tokio::task::spawn_blocking(move || {
        let mut frames = Vec::new();
        for _ in 0..5 {
            frames.push(display.request_frame().unwrap());
        }
        display.terminate().unwrap();
        frames
    })
    .await
    .unwrap();

    let report = group.join().await.unwrap();
    assert_eq!(frames.len(), 5);
    assert!(frames.iter().all(|frame| frame.live_cells() == block));
    assert_eq!(report.frames_served, 5);
    assert_eq!(report.snapshot.live_cells(), block);
}

#[tokio::test]
async fn test_dropping_the_display_halts_every_worker() {
    let grid_dims = dims(10, 10);
    let config = SimConfig::new(grid_dims).with_workers(4).with_seed(5);

    let (group, display) = ComputeGroup::spawn(&Handle::current(), &config, None).unwrap();
    tokio::task::spawn_blocking(move || {
        let mut display = display;
        display.request_frame().unwrap();
    })
    .await
    .unwrap();

    let report = group.join().await.unwrap();
    assert_eq!(report.frames_served, 1);
}

/// Every request made before the generation limit is answered; the last
/// frame is the final grid and only then does the display see the group gone.
#[tokio::test]
async fn test_display_sees_finished_group() {
    let grid_dims = dims(6, 6);
    let config = SimConfig::new(grid_dims).with_workers(2).with_max_generations(2);
    let pattern = Pattern::new(grid_dims, vec![(2, 1), (2, 2), (2, 3)]);

    let (group, display) = ComputeGroup::spawn(&Handle::current(), &config, Some(&pattern)).unwrap();
    let (frames, outcome) = tokio::task::spawn_blocking(move || {
        let mut display = display;
        let mut frames = Vec::new();
        loop {
            match display.request_frame() {
                Ok(frame) => frames.push(frame),
                Err(err) => return (frames, err),
            }
        }
    })
    .await
    .unwrap();

    let report = group.join().await.unwrap();
    assert!(matches!(outcome, CommError::PeerGone { .. }));
    assert_eq!(report.generations, 2);
    assert_eq!(report.frames_served, frames.len() as u64);
    assert_eq!(frames.last(), Some(&report.snapshot));
    assert_eq!(report.snapshot, GlobalGrid::from_pattern(&pattern));
}

/// A group that stops at generation 0 still answers the display's first
/// request with the initial grid, however late it arrives.
#[tokio::test]
async fn test_generation_limit_answers_first_request() {
    let grid_dims = dims(8, 8);
    let pattern = Pattern::new(grid_dims, vec![(1, 2), (2, 3), (3, 1), (3, 2), (3, 3)]);
    let config = SimConfig::new(grid_dims).with_workers(2).with_max_generations(0);

    for _ in 0..20 {
        let (group, display) = ComputeGroup::spawn(&Handle::current(), &config, Some(&pattern)).unwrap();
        let frame = tokio::task::spawn_blocking(move || {
            let mut display = display;
            display.request_frame()
        })
        .await
        .unwrap();

        assert_eq!(frame.unwrap(), GlobalGrid::from_pattern(&pattern));
        let report = group.join().await.unwrap();
        assert_eq!(report.generations, 0);
        assert_eq!(report.frames_served, 1);
    }
}

#[tokio::test]
async fn test_detached_group_needs_generation_limit() {
    let config = SimConfig::new(dims(4, 4)).with_workers(2);
    let err = run_detached(&config, None).await.unwrap_err();
    assert!(matches!(err, LifeError::Config(_)));
}
