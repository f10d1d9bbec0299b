//! Worker pool: a fixed number of threads, each pulling the next task and running the
//! digest function to completion before pulling again.
//!
//! The pool size is the concurrency limit. Every admitted task produces exactly one
//! outcome; once the gate closes, remaining tasks are received and counted but not run,
//! so the walk never blocks on a full channel with nobody reading.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::digest::DigestFn;
use crate::{FailureKind, Outcome, Task};

use super::admission::Admission;

/// Run one task through `digest`, converting errors and panics into a failure outcome.
pub fn run_task(digest: &DigestFn, task: Task, file_timeout: Option<Duration>) -> Outcome {
    let Task { path } = task;
    let deadline = file_timeout.and_then(|t| Instant::now().checked_add(t));
    match panic::catch_unwind(AssertUnwindSafe(|| digest(&path, deadline))) {
        Ok(Ok(digest)) => Outcome::Success { path, digest },
        Ok(Err(err)) => Outcome::failure(path, err.kind(), err.to_string()),
        Err(_) => {
            warn!("digest panicked for {}", path.display());
            Outcome::failure(path, FailureKind::Read, "digest function panicked")
        }
    }
}

fn worker_loop(
    id: usize,
    task_rx: Receiver<Task>,
    outcome_tx: Sender<Outcome>,
    digest: DigestFn,
    gate: Arc<Admission>,
    file_timeout: Option<Duration>,
) {
    let mut done = 0_usize;
    while let Ok(task) = task_rx.recv() {
        let Some(_slot) = gate.try_admit() else {
            continue;
        };
        let outcome = run_task(&digest, task, file_timeout);
        if outcome_tx.send(outcome).is_err() {
            break;
        }
        done += 1;
    }
    debug!("worker {}: exiting after {} tasks", id, done);
}

/// Spawn `jobs` workers reading `task_rx` and writing `outcome_tx`. Caller must drop its own
/// `outcome_tx` after this so the fan-in sees the channel close once workers exit.
pub fn spawn_workers(
    task_rx: Receiver<Task>,
    outcome_tx: &Sender<Outcome>,
    digest: &DigestFn,
    gate: &Arc<Admission>,
    jobs: usize,
    file_timeout: Option<Duration>,
) -> Vec<JoinHandle<()>> {
    (0..jobs)
        .map(|id| {
            let task_rx = task_rx.clone();
            let outcome_tx = outcome_tx.clone();
            let digest = Arc::clone(digest);
            let gate = Arc::clone(gate);
            thread::spawn(move || {
                worker_loop(id, task_rx, outcome_tx, digest, gate, file_timeout)
            })
        })
        .collect()
}
