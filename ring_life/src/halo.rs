//! Ghost-row exchange around the worker ring.
//!
//! Each worker sends its first owned row up the ring (to its predecessor's
//! bottom ghost) and its last owned row down the ring (to its successor's top
//! ghost). The two directions travel on separate tags, so a single worker
//! that is its own predecessor and successor still fills each ghost row from
//! the right source.

use crate::comm::{Endpoint, Tag};
use crate::error::CommError;
use crate::grid::GridPartition;

/// Refresh both ghost rows of `partition`. Returns once both have arrived;
/// the next rule step may then read them.
pub async fn exchange(partition: &mut GridPartition, ring: &mut Endpoint) -> Result<(), CommError> {
    let predecessor = ring.predecessor();
    let successor = ring.successor();

    ring.send(predecessor, Tag::HaloUp, partition.first_row().to_vec())?;
    ring.send(successor, Tag::HaloDown, partition.last_row().to_vec())?;

    let top = ring.recv(predecessor, Tag::HaloDown).await?;
    check_row(partition, predecessor, Tag::HaloDown, &top)?;
    let bottom = ring.recv(successor, Tag::HaloUp).await?;
    check_row(partition, successor, Tag::HaloUp, &bottom)?;

    partition.set_top_ghost(&top);
    partition.set_bottom_ghost(&bottom);
    Ok(())
}

fn check_row(partition: &GridPartition, rank: usize, tag: Tag, row: &[u8]) -> Result<(), CommError> {
    if row.len() == partition.cols() {
        Ok(())
    } else {
        Err(CommError::Malformed {
            rank,
            tag,
            expected: partition.cols(),
            got: row.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{Fabric, GROUP_TAGS};
    use crate::grid::GridDims;
    use crate::pattern::Pattern;

    /// Every row filled with its global index + 1 in column 0.
    fn numbered(dims: GridDims) -> Pattern {
        let cells = (0..dims.rows).map(|row| (row, row % dims.cols)).collect();
        Pattern::new(dims, cells)
    }

    #[tokio::test]
    async fn test_single_worker_wraps_onto_itself() {
        let dims = GridDims::new(4, 4).unwrap();
        let pattern = Pattern::new(dims, vec![(0, 0), (3, 2)]);
        let mut partition = GridPartition::new(0, 1, dims, Some(&pattern), None).unwrap();
        let mut ring = Fabric::connect(1, GROUP_TAGS).remove(0);

        exchange(&mut partition, &mut ring).await.unwrap();

        assert_eq!(partition.top_ghost(), &[0, 0, 1, 0]);
        assert_eq!(partition.bottom_ghost(), &[1, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_ring_sources_ghosts_from_neighbours() {
        let dims = GridDims::new(7, 4).unwrap();
        let pattern = numbered(dims);
        let workers = 3;

        let mut handles = Vec::new();
        for (rank, mut ring) in Fabric::connect(workers, GROUP_TAGS).into_iter().enumerate() {
            let mut partition = GridPartition::new(rank, workers, dims, Some(&pattern), None).unwrap();
            handles.push(tokio::spawn(async move {
                exchange(&mut partition, &mut ring).await.unwrap();
                partition
            }));
        }

        let mut partitions = Vec::new();
        for handle in handles {
            partitions.push(handle.await.unwrap());
        }

        for partition in &partitions {
            let band = partition.band();
            let above = (band.start + dims.rows - 1) % dims.rows;
            let below = band.end() % dims.rows;

            let mut expected_top = vec![0; dims.cols];
            expected_top[above % dims.cols] = 1;
            let mut expected_bottom = vec![0; dims.cols];
            expected_bottom[below % dims.cols] = 1;

            assert_eq!(partition.top_ghost(), expected_top.as_slice(), "rank {}", partition.rank());
            assert_eq!(partition.bottom_ghost(), expected_bottom.as_slice(), "rank {}", partition.rank());
        }
    }

    #[tokio::test]
    async fn test_short_row_is_rejected() {
        let dims = GridDims::new(2, 3).unwrap();
        let mut partition = GridPartition::new(0, 2, dims, None, Some(1)).unwrap();
        let mut endpoints = Fabric::connect(2, GROUP_TAGS);
        let mut ring = endpoints.remove(0);
        let neighbour = endpoints.remove(0);

        neighbour.send(0, Tag::HaloDown, vec![1]).unwrap();
        neighbour.send(0, Tag::HaloUp, vec![1, 1, 1]).unwrap();

        let err = exchange(&mut partition, &mut ring).await.unwrap_err();
        assert!(matches!(err, CommError::Malformed { expected: 3, got: 1, .. }));
    }
}
