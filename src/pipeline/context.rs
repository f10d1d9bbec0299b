//! Pipeline context and tuning: shared data passed into the walk thread and the worker pool.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::error::ConfigError;
use crate::utils::config::{ChannelCaps, WorkerLimits};
use crate::utils::fd_limit::cap_jobs_by_fd_limit;
use crate::{Outcome, SignOpts, Task, WalkPolicy};

use super::admission::Admission;

/// Worker count, walk mode and channel caps for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineTuning {
    pub jobs: usize,
    pub parallel_walk: bool,
    pub task_cap: usize,
    pub outcome_cap: usize,
}

impl PipelineTuning {
    /// Explicit `jobs` is used as given (must be ≥ 1). Otherwise available threads, capped by the FD limit.
    pub fn from_opts(opts: &SignOpts) -> Result<Self, ConfigError> {
        let jobs = match opts.jobs {
            Some(0) => return Err(ConfigError::InvalidConcurrency { value: 0 }),
            Some(n) => n,
            None => cap_jobs_by_fd_limit(WorkerLimits::current().default_jobs()),
        };
        Ok(Self {
            jobs,
            parallel_walk: opts.parallel_walk,
            task_cap: ChannelCaps::tasks(jobs),
            outcome_cap: ChannelCaps::outcomes(jobs),
        })
    }
}

/// Shared context for the walk thread: root, traversal policy and the admission gate.
pub struct PipelineContext {
    pub root: PathBuf,
    pub policy: WalkPolicy,
    pub gate: Arc<Admission>,
}

/// Channels for the pipeline. Walk gets `task_tx` and a clone of `outcome_tx` (traversal
/// failures); workers get `task_rx` and `outcome_tx`; the fan-in owns `outcome_rx`.
pub struct PipelineChannels {
    pub task_tx: Sender<Task>,
    pub task_rx: Receiver<Task>,
    pub outcome_tx: Sender<Outcome>,
    pub outcome_rx: Receiver<Outcome>,
    pub ctx: PipelineContext,
}

pub fn create_pipeline_channels(
    root: &Path,
    opts: &SignOpts,
    tuning: &PipelineTuning,
    gate: &Arc<Admission>,
) -> PipelineChannels {
    let (task_tx, task_rx) = bounded::<Task>(tuning.task_cap);
    let (outcome_tx, outcome_rx) = bounded::<Outcome>(tuning.outcome_cap);

    let ctx = PipelineContext {
        root: root.to_path_buf(),
        policy: opts.policy.clone(),
        gate: Arc::clone(gate),
    };

    PipelineChannels {
        task_tx,
        task_rx,
        outcome_tx,
        outcome_rx,
        ctx,
    }
}

/// Handles returned by [`run_pipeline`](super::run_pipeline): receive outcomes, then join.
pub struct PipelineHandles {
    pub outcome_rx: Receiver<Outcome>,
    pub walk_handle: JoinHandle<usize>,
    pub worker_handles: Vec<JoinHandle<()>>,
    pub gate: Arc<Admission>,
    pub tuning: PipelineTuning,
    pub started: Instant,
}
