//! Error types for the compute group and the display bridge.

use crate::comm::{Rank, Tag};
use std::fmt;
use thiserror::Error;

/// Invalid startup configuration. Reported once, then the group shuts down
/// cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("grid dimensions must be positive, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("compute group needs at least one worker")]
    NoWorkers,

    #[error("{workers} workers cannot split {rows} rows: every worker must own at least one row")]
    TooManyWorkers { workers: usize, rows: usize },

    #[error("rank {rank} is outside a group of {workers} workers")]
    RankOutOfRange { rank: usize, workers: usize },

    #[error("a compute group without a display needs a generation limit")]
    NoStopCondition,

    #[error("no such pattern '{name}'. Available ones are: {available}")]
    UnknownPattern { name: String, available: String },

    #[error("pattern authored for {pattern_rows}x{pattern_cols} but grid is {rows}x{cols}")]
    PatternMismatch {
        pattern_rows: usize,
        pattern_cols: usize,
        rows: usize,
        cols: usize,
    },
}

/// Failure of a single message operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommError {
    #[error("peer rank {rank} disappeared (channel {tag:?})")]
    PeerGone { rank: Rank, tag: Tag },

    #[error("no route from rank {from} to rank {to} on channel {tag:?}")]
    NoRoute { from: Rank, to: Rank, tag: Tag },

    #[error("malformed {tag:?} payload from rank {rank}: expected {expected} bytes, got {got}")]
    Malformed {
        rank: Rank,
        tag: Tag,
        expected: usize,
        got: usize,
    },

    #[error("unknown control token {0}")]
    UnknownSignal(i32),

    #[error("display bridge already terminated")]
    BridgeClosed,
}

/// The part of a generation that was running when communication failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decomposition,
    HaloExchange,
    Gather,
    Bridge,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decomposition => "decomposition",
            Stage::HaloExchange => "halo exchange",
            Stage::Gather => "gather",
            Stage::Bridge => "bridge",
        };
        f.write_str(name)
    }
}

/// Top-level error of the simulation core. Any `Communication` error is
/// fatal for the whole compute group.
#[derive(Debug, Error)]
pub enum LifeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{stage} failed: {source}")]
    Communication {
        stage: Stage,
        #[source]
        source: CommError,
    },

    #[error("worker task failed: {0}")]
    WorkerTask(String),
}

impl LifeError {
    /// The failing stage, if the error came from a message operation.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            LifeError::Communication { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Attach the running stage to a transport result.
pub(crate) trait StageExt<T> {
    fn during(self, stage: Stage) -> Result<T, LifeError>;
}

impl<T> StageExt<T> for Result<T, CommError> {
    fn during(self, stage: Stage) -> Result<T, LifeError> {
        self.map_err(|source| LifeError::Communication { stage, source })
    }
}
