// headless.rs - Display without a window: pulls a fixed number of frames and logs them

use ring_life::{CommError, DisplayLink, GlobalGrid};
use std::time::Instant;
use tracing::info;

/// Request up to `frames` snapshots, then stop the group.
///
/// Returns the last frame received. A group that already finished on its
/// own (generation limit) hands over its last grid and then ends the run
/// early instead of failing it.
pub fn run_headless(mut link: DisplayLink, frames: u64) -> Result<Option<GlobalGrid>, CommError> {
    let mut last = None;
    for frame in 1..=frames {
        let started = Instant::now();
        match link.request_frame() {
            Ok(grid) => {
                info!(
                    frame,
                    population = grid.population(),
                    wait_us = started.elapsed().as_micros() as u64,
                    "Frame received"
                );
                last = Some(grid);
            }
            Err(CommError::PeerGone { .. }) if last.is_some() => {
                info!(frame, "Compute group finished before all frames were drawn");
                return Ok(last);
            }
            Err(err) => return Err(err),
        }
    }

    link.terminate()?;
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring_life::{ComputeGroup, GridDims, Pattern, SimConfig};

    #[test]
    fn test_headless_run_stops_the_group() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dims = GridDims::new(10, 10).unwrap();
        let pattern = Pattern::new(dims, vec![(4, 3), (4, 4), (4, 5)]);
        let config = SimConfig::new(dims).with_workers(3);

        let (group, link) = ComputeGroup::spawn(runtime.handle(), &config, Some(&pattern)).unwrap();
        let last = run_headless(link, 4).unwrap().unwrap();
        let report = runtime.block_on(group.join()).unwrap();

        assert_eq!(last.population(), 3);
        assert_eq!(report.frames_served, 4);
    }

    #[test]
    fn test_generation_limit_ends_the_run_cleanly() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dims = GridDims::new(6, 6).unwrap();
        let pattern = Pattern::new(dims, vec![(2, 1), (2, 2), (2, 3)]);
        let config = SimConfig::new(dims).with_workers(2).with_max_generations(0);

        let (group, link) = ComputeGroup::spawn(runtime.handle(), &config, Some(&pattern)).unwrap();
        let last = run_headless(link, 5).unwrap().unwrap();
        let report = runtime.block_on(group.join()).unwrap();

        assert_eq!(last, report.snapshot);
        assert_eq!(report.generations, 0);
        assert_eq!(report.frames_served, 1);
    }

    #[test]
    fn test_zero_frames_just_terminates() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dims = GridDims::new(4, 4).unwrap();
        let config = SimConfig::new(dims).with_workers(2).with_seed(3);

        let (group, link) = ComputeGroup::spawn(runtime.handle(), &config, None).unwrap();
        assert!(run_headless(link, 0).unwrap().is_none());
        assert_eq!(runtime.block_on(group.join()).unwrap().frames_served, 0);
    }
}
