use log::{debug, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::engine::digest::DigestFn;
use crate::engine::tools::validate_root;
use crate::error::{Result, SignError};
use crate::report::OutcomeSink;
use crate::{RunReport, SignOpts, Summary};

use super::admission::{Admission, CancelToken};
use super::context::{PipelineHandles, PipelineTuning, create_pipeline_channels};
use super::walk::spawn_walk_thread;
use super::workers::spawn_workers;

/// Start the walk + worker pipeline. Root and tuning are validated first; any error here is
/// fatal and nothing has been spawned. Caller drains `outcome_rx` via [`drain_pipeline`].
pub fn run_pipeline(
    root: &Path,
    opts: &SignOpts,
    digest: DigestFn,
    cancel: &CancelToken,
) -> Result<PipelineHandles> {
    validate_root(root)?;
    let tuning = PipelineTuning::from_opts(opts)?;
    debug!(
        "pipeline: {} workers, {} walk, task cap {}, outcome cap {}",
        tuning.jobs,
        if tuning.parallel_walk { "parallel" } else { "serial" },
        tuning.task_cap,
        tuning.outcome_cap
    );

    let started = Instant::now();
    let gate = Arc::new(Admission::new(cancel.clone(), opts.run_deadline));
    let channels = create_pipeline_channels(root, opts, &tuning, &gate);

    let worker_handles = spawn_workers(
        channels.task_rx,
        &channels.outcome_tx,
        &digest,
        &gate,
        tuning.jobs,
        opts.file_timeout,
    );

    // Walk owns the last outcome sender; once it and all workers exit, the fan-in loop ends.
    let walk_handle = spawn_walk_thread(
        channels.task_tx,
        channels.outcome_tx,
        channels.ctx,
        tuning.parallel_walk,
    );

    Ok(PipelineHandles {
        outcome_rx: channels.outcome_rx,
        walk_handle,
        worker_handles,
        gate,
        tuning,
        started,
    })
}

/// Fan-in: hand every outcome to `sink` exactly once, then join the walk and all workers.
/// Returns only after the walk is exhausted and every admitted task has reported.
///
/// A sink write error closes admission, keeps draining so no thread is left blocked,
/// and is returned once everything has joined.
pub fn drain_pipeline<S>(handles: PipelineHandles, sink: &mut S) -> Result<RunReport>
where
    S: OutcomeSink + ?Sized,
{
    let PipelineHandles {
        outcome_rx,
        walk_handle,
        worker_handles,
        gate,
        tuning: _,
        started,
    } = handles;

    let mut summary = Summary::default();
    let mut sink_error: Option<std::io::Error> = None;
    while let Ok(outcome) = outcome_rx.recv() {
        summary.record(&outcome);
        if sink_error.is_some() {
            continue;
        }
        if let Err(e) = sink.accept(outcome) {
            warn!("result sink failed, stopping admission: {}", e);
            gate.stop();
            sink_error = Some(e);
        }
    }
    debug!("fan-in: channel closed after {} outcomes", summary.total());

    let emitted = walk_handle
        .join()
        .map_err(|_| SignError::Thread("walk"))?;
    for h in worker_handles {
        h.join().map_err(|_| SignError::Thread("worker"))?;
    }

    if sink_error.is_none()
        && let Err(e) = sink.finish()
    {
        sink_error = Some(e);
    }
    if let Some(e) = sink_error {
        return Err(SignError::Sink(e));
    }

    Ok(RunReport {
        summary,
        status: gate.status(),
        emitted,
        not_admitted: gate.not_admitted(),
        peak_in_flight: gate.peak(),
        elapsed: started.elapsed(),
    })
}

/// Run the whole pipeline with an explicit digest function.
pub fn sign_dir_with<S>(
    root: &Path,
    opts: &SignOpts,
    digest: DigestFn,
    cancel: &CancelToken,
    sink: &mut S,
) -> Result<RunReport>
where
    S: OutcomeSink + ?Sized,
{
    let handles = run_pipeline(root, opts, digest, cancel)?;
    drain_pipeline(handles, sink)
}
