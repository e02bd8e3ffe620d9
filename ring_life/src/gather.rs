//! Variable-length gather of every partition's owned rows at the collector.

use crate::comm::{Endpoint, Rank, Tag, decode_len, encode_len};
use crate::error::CommError;
use crate::grid::{GlobalGrid, GridDims, GridPartition};

/// Per-rank contribution lengths and their offsets in the global buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherPlan {
    counts: Vec<usize>,
    displacements: Vec<usize>,
    total: usize,
}

impl GatherPlan {
    /// Displacements are the exclusive prefix sums of `counts`.
    pub fn from_counts(counts: Vec<usize>) -> Self {
        let mut displacements = Vec::with_capacity(counts.len());
        let mut offset = 0;
        for &count in &counts {
            displacements.push(offset);
            offset += count;
        }
        Self {
            counts,
            displacements,
            total: offset,
        }
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn displacements(&self) -> &[usize] {
        &self.displacements
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// Collective plan negotiation: every rank reports its contribution length
/// to `collector`, which builds the plan. Other ranks get `None`.
pub async fn negotiate(
    partition: &GridPartition,
    group: &mut Endpoint,
    collector: Rank,
) -> Result<Option<GatherPlan>, CommError> {
    group.send(collector, Tag::GatherCount, encode_len(partition.live_cells().len()))?;
    if group.rank() != collector {
        return Ok(None);
    }

    let mut counts = Vec::with_capacity(group.size());
    for src in 0..group.size() {
        let payload = group.recv(src, Tag::GatherCount).await?;
        counts.push(decode_len(src, Tag::GatherCount, &payload)?);
    }
    Ok(Some(GatherPlan::from_counts(counts)))
}

/// Collect all owned rows in rank order. Only the collector, which must hold
/// the plan, gets the assembled grid.
pub async fn gather(
    partition: &GridPartition,
    group: &mut Endpoint,
    collector: Rank,
    plan: Option<&GatherPlan>,
) -> Result<Option<GlobalGrid>, CommError> {
    group.send(collector, Tag::GatherData, partition.live_cells().to_vec())?;
    let Some(plan) = plan else {
        return Ok(None);
    };

    let dims: GridDims = partition.dims();
    let mut buffer = vec![0u8; plan.total()];
    for src in 0..group.size() {
        let rows = group.recv(src, Tag::GatherData).await?;
        let (offset, count) = (plan.displacements[src], plan.counts[src]);
        if rows.len() != count {
            return Err(CommError::Malformed {
                rank: src,
                tag: Tag::GatherData,
                expected: count,
                got: rows.len(),
            });
        }
        buffer[offset..offset + count].copy_from_slice(&rows);
    }

    GlobalGrid::from_cells(dims, buffer)
        .map(Some)
        .ok_or(CommError::Malformed {
            rank: collector,
            tag: Tag::GatherData,
            expected: dims.cell_count(),
            got: plan.total(),
        })
}
