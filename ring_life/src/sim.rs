//! The compute group: one task per worker, each driving
//! rule step → halo exchange → gather → bridge poll every generation.

use crate::bridge::{self, CollectorLink, DisplayLink, PollOutcome};
use crate::comm::{Endpoint, Fabric, GROUP_TAGS, Rank, Tag};
use crate::error::{CommError, ConfigError, LifeError, Stage, StageExt};
use crate::gather;
use crate::grid::{GlobalGrid, GridDims, GridPartition};
use crate::halo;
use crate::pattern::Pattern;
use crate::rule;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

/// Group rank that assembles snapshots and talks to the display.
pub const COLLECTOR: Rank = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    pub dims: GridDims,
    pub workers: usize,
    /// Stop after this many generations.
    pub max_generations: Option<u64>,
    /// Seed for the random fill; each worker offsets it by its rank.
    pub seed: Option<u64>,
}

impl SimConfig {
    pub fn new(dims: GridDims) -> Self {
        Self {
            dims,
            workers: 1,
            max_generations: None,
            seed: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_generations(mut self, generations: u64) -> Self {
        self.max_generations = Some(generations);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self, detached: bool) -> Result<(), ConfigError> {
        GridDims::new(self.dims.rows, self.dims.cols)?;
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.workers > self.dims.rows {
            return Err(ConfigError::TooManyWorkers {
                workers: self.workers,
                rows: self.dims.rows,
            });
        }
        if detached && self.max_generations.is_none() {
            return Err(ConfigError::NoStopCondition);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Continue,
    Halt,
}

impl Verdict {
    fn encode(self) -> Vec<u8> {
        vec![u8::from(self == Verdict::Halt)]
    }

    fn decode(payload: &[u8]) -> Result<Self, CommError> {
        match payload {
            [0] => Ok(Verdict::Continue),
            [1] => Ok(Verdict::Halt),
            _ => Err(CommError::Malformed {
                rank: COLLECTOR,
                tag: Tag::Verdict,
                expected: 1,
                got: payload.len(),
            }),
        }
    }
}

/// What one worker hands back when its loop ends.
#[derive(Debug)]
pub struct WorkerReport {
    pub rank: Rank,
    pub generations: u64,
    /// Last gathered grid; only the collector has one.
    pub snapshot: Option<GlobalGrid>,
    pub frames_served: u64,
}

/// Outcome of a whole group run.
#[derive(Debug)]
pub struct GroupReport {
    pub generations: u64,
    pub snapshot: GlobalGrid,
    pub frames_served: u64,
}

struct Worker {
    partition: GridPartition,
    group: Endpoint,
    bridge: Option<CollectorLink>,
    max_generations: Option<u64>,
}

impl Worker {
    async fn run(mut self) -> Result<WorkerReport, LifeError> {
        let rank = self.group.rank();

        halo::exchange(&mut self.partition, &mut self.group)
            .await
            .during(Stage::HaloExchange)?;
        let plan = gather::negotiate(&self.partition, &mut self.group, COLLECTOR)
            .await
            .during(Stage::Decomposition)?;

        let mut generation = 0u64;
        let mut snapshot = None;
        loop {
            let started = Instant::now();
            let grid = gather::gather(&self.partition, &mut self.group, COLLECTOR, plan.as_ref())
                .await
                .during(Stage::Gather)?;
            if grid.is_some() {
                debug!(generation, elapsed_us = started.elapsed().as_micros() as u64, "Gathered grid");
            }

            let verdict = self.decide(grid.as_ref(), generation).await?;
            let verdict = self
                .group
                .broadcast(COLLECTOR, Tag::Verdict, verdict.encode())
                .await
                .and_then(|payload| Verdict::decode(&payload))
                .during(Stage::Bridge)?;
            if grid.is_some() {
                snapshot = grid;
            }
            if verdict == Verdict::Halt {
                break;
            }

            let started = Instant::now();
            rule::step(&mut self.partition);
            halo::exchange(&mut self.partition, &mut self.group)
                .await
                .during(Stage::HaloExchange)?;
            generation += 1;
            debug!(generation, elapsed_us = started.elapsed().as_micros() as u64, "Computed generation");
        }

        info!(generation, "Worker halted");
        Ok(WorkerReport {
            rank,
            generations: generation,
            snapshot,
            frames_served: self.bridge.as_ref().map_or(0, CollectorLink::frames_served),
        })
    }

    /// Collector only: serve a pending frame request and decide whether the
    /// group keeps going. At the generation limit a display that has not
    /// asked yet is held until it takes the last grid or lets go.
    async fn decide(&mut self, grid: Option<&GlobalGrid>, generation: u64) -> Result<Verdict, LifeError> {
        let Some(grid) = grid else {
            return Ok(Verdict::Continue);
        };

        let limit_reached = self.max_generations.is_some_and(|max| generation >= max);
        let Some(bridge) = self.bridge.as_mut() else {
            return Ok(if limit_reached { Verdict::Halt } else { Verdict::Continue });
        };

        let mut outcome = bridge.poll(grid).during(Stage::Bridge)?;
        if limit_reached && outcome == PollOutcome::NoSignal {
            info!(generation, "Generation limit reached, waiting for the display");
            outcome = bridge.serve_last(grid).await.during(Stage::Bridge)?;
        }
        if outcome == PollOutcome::Terminated {
            info!(generation, "Termination requested by display");
            return Ok(Verdict::Halt);
        }
        Ok(if limit_reached { Verdict::Halt } else { Verdict::Continue })
    }
}

/// Handle on a running compute group.
pub struct ComputeGroup {
    handles: Vec<JoinHandle<Result<WorkerReport, LifeError>>>,
}

impl ComputeGroup {
    /// Start the group on `runtime` with a display attached to the
    /// collector. Without `pattern`, partitions are filled at random.
    pub fn spawn(
        runtime: &Handle,
        config: &SimConfig,
        pattern: Option<&Pattern>,
    ) -> Result<(Self, DisplayLink), LifeError> {
        config.validate(false)?;
        let (display, collector) = bridge::connect(config.dims);
        let group = Self::start(runtime, config, pattern, Some(collector))?;
        Ok((group, display))
    }

    /// Start the group with no display; it runs to `max_generations`.
    pub fn spawn_detached(
        runtime: &Handle,
        config: &SimConfig,
        pattern: Option<&Pattern>,
    ) -> Result<Self, LifeError> {
        config.validate(true)?;
        Self::start(runtime, config, pattern, None)
    }

    fn start(
        runtime: &Handle,
        config: &SimConfig,
        pattern: Option<&Pattern>,
        mut collector: Option<CollectorLink>,
    ) -> Result<Self, LifeError> {
        if let Some(pattern) = pattern {
            pattern.check_dims(config.dims)?;
            let ignored = pattern.out_of_range();
            if !ignored.is_empty() {
                warn!(count = ignored.len(), cells = ?ignored, "Pattern cells outside the grid are ignored");
            }
        }

        let mut workers = Vec::with_capacity(config.workers);
        for (rank, group) in Fabric::connect(config.workers, GROUP_TAGS).into_iter().enumerate() {
            let partition = GridPartition::new(rank, config.workers, config.dims, pattern, config.seed)?;
            info!(
                rank,
                start = partition.start_loc(),
                rows = partition.local_rows(),
                "Partition assigned"
            );
            workers.push(Worker {
                partition,
                group,
                bridge: if rank == COLLECTOR { collector.take() } else { None },
                max_generations: config.max_generations,
            });
        }

        let handles = workers
            .into_iter()
            .map(|worker| {
                let span = info_span!("worker", rank = worker.group.rank());
                runtime.spawn(worker.run().instrument(span))
            })
            .collect();
        Ok(Self { handles })
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker. When several fail, the error closest to the
    /// root cause is returned rather than a neighbour's lost-peer error.
    pub async fn join(self) -> Result<GroupReport, LifeError> {
        let mut reports = Vec::with_capacity(self.handles.len());
        let mut errors = Vec::new();
        for handle in self.handles {
            match handle.await {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(err)) => errors.push(err),
                Err(join_err) => errors.push(LifeError::WorkerTask(join_err.to_string())),
            }
        }

        if !errors.is_empty() {
            let root = errors
                .iter()
                .position(|err| {
                    !matches!(
                        err,
                        LifeError::Communication {
                            source: CommError::PeerGone { .. },
                            ..
                        }
                    )
                })
                .unwrap_or(0);
            return Err(errors.swap_remove(root));
        }

        let collector = reports
            .into_iter()
            .find(|report| report.rank == COLLECTOR)
            .ok_or_else(|| LifeError::WorkerTask("collector produced no report".to_string()))?;
        let snapshot = collector
            .snapshot
            .ok_or_else(|| LifeError::WorkerTask("collector gathered no grid".to_string()))?;
        Ok(GroupReport {
            generations: collector.generations,
            snapshot,
            frames_served: collector.frames_served,
        })
    }
}

/// Run a detached group for `config.max_generations` and return the final
/// grid.
pub async fn run_detached(config: &SimConfig, pattern: Option<&Pattern>) -> Result<GroupReport, LifeError> {
    ComputeGroup::spawn_detached(&Handle::current(), config, pattern)?
        .join()
        .await
}
