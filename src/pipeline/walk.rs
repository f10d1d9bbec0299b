//! Task source: walk the tree and turn every admitted file into a [`Task`].
//!
//! The walk runs on its own thread and pushes into a bounded channel, so it only
//! runs ahead of the pool by the channel capacity. Directory errors become
//! traversal failures on the outcome channel and the walk carries on.

use crossbeam_channel::Sender;
use log::debug;
use std::fs::FileType;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crate::engine::tools::is_excluded;
use crate::{FailureKind, Outcome, Task, WalkPolicy};

use super::context::PipelineContext;

/// What a walk entry is, after link resolution (when following links).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    Symlink,
    Special,
}

impl From<FileType> for EntryKind {
    fn from(ft: FileType) -> Self {
        if ft.is_dir() {
            EntryKind::Dir
        } else if ft.is_file() {
            EntryKind::File
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Special
        }
    }
}

impl WalkPolicy {
    /// Directories are never tasks; unfollowed symlinks are skipped; special files only on request.
    pub fn admits(&self, kind: EntryKind) -> bool {
        match kind {
            EntryKind::File => true,
            EntryKind::Special => self.include_special,
            EntryKind::Dir | EntryKind::Symlink => false,
        }
    }
}

/// One result from a directory walk: either an entry or an error with optional path.
pub enum WalkOutcome {
    Entry { path: PathBuf, kind: EntryKind },
    Err { msg: String, path: Option<PathBuf> },
}

fn jwalk_error(err: &jwalk::Error, dir: Option<PathBuf>) -> WalkOutcome {
    WalkOutcome::Err {
        msg: err
            .io_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| err.to_string()),
        path: err.path().map(PathBuf::from).or(dir),
    }
}

/// Convert a jwalk result into [`WalkOutcome`]s. jwalk reports a directory that cannot be
/// listed on that directory's own entry, so one entry may also yield an error.
pub fn to_outcomes_jwalk(
    r: Result<jwalk::DirEntry<((), ())>, jwalk::Error>,
) -> impl Iterator<Item = WalkOutcome> {
    let (first, listing) = match r {
        Ok(mut entry) => {
            let path = entry.path();
            let listing = entry
                .read_children_error
                .take()
                .map(|err| jwalk_error(&err, Some(path.clone())));
            let kind = EntryKind::from(entry.file_type);
            (WalkOutcome::Entry { path, kind }, listing)
        }
        Err(err) => (jwalk_error(&err, None), None),
    };
    std::iter::once(first).chain(listing)
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Entry {
            kind: EntryKind::from(entry.file_type()),
            path: entry.into_path(),
        },
        Err(err) => WalkOutcome::Err {
            msg: err
                .io_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| err.to_string()),
            path: err.path().map(PathBuf::from),
        },
    }
}

fn jwalk_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use jwalk::Parallelism;
    use std::time::Duration;
    Box::new(
        jwalk::WalkDir::new(&ctx.root)
            .follow_links(ctx.policy.follow_links)
            .skip_hidden(false)
            .parallelism(Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_secs(60),
            })
            .into_iter()
            .flat_map(to_outcomes_jwalk),
    )
}

/// Serial, demand-driven walk. Excluded directories are pruned, not descended.
fn walkdir_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use walkdir::WalkDir;
    let root = ctx.root.clone();
    let exclude = ctx.policy.exclude.clone();
    Box::new(
        WalkDir::new(&ctx.root)
            .follow_links(ctx.policy.follow_links)
            .into_iter()
            .filter_entry(move |e| e.depth() == 0 || !is_excluded(e.path(), &root, &exclude))
            .map(to_outcome_walkdir),
    )
}

pub fn spawn_walk_thread(
    task_tx: Sender<Task>,
    outcome_tx: Sender<Outcome>,
    ctx: PipelineContext,
    parallel_walk: bool,
) -> JoinHandle<usize> {
    thread::spawn(move || {
        let iter: Box<dyn Iterator<Item = WalkOutcome>> = match parallel_walk {
            true => jwalk_iter(&ctx),
            false => walkdir_iter(&ctx),
        };
        run_walk_loop(task_tx, outcome_tx, &ctx, iter)
    })
}

/// Run the common walk loop: consume `iter`, send admitted files to `task_tx`, send
/// traversal failures to `outcome_tx`. Stops early once the admission gate closes.
/// Drops `task_tx` when done so workers drain and exit. Returns the number of tasks sent.
pub fn run_walk_loop<I>(
    task_tx: Sender<Task>,
    outcome_tx: Sender<Outcome>,
    ctx: &PipelineContext,
    iter: I,
) -> usize
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut count = 0_usize;
    for outcome in iter {
        if !ctx.gate.is_open() {
            debug!("walk: admission closed after {} tasks", count);
            break;
        }
        match outcome {
            WalkOutcome::Entry { path, kind } => {
                if !ctx.policy.admits(kind) || is_excluded(&path, &ctx.root, &ctx.policy.exclude)
                {
                    continue;
                }
                if task_tx.send(Task::new(path)).is_err() {
                    break;
                }
                count += 1;
            }
            WalkOutcome::Err { msg, path } => {
                let path = path.unwrap_or_else(|| ctx.root.clone());
                debug!("walk: cannot traverse {}: {}", path.display(), msg);
                let failure = Outcome::failure(path, FailureKind::Traversal, msg);
                if outcome_tx.send(failure).is_err() {
                    break;
                }
            }
        }
    }
    drop(task_tx);
    debug!("walk: done, {} tasks emitted", count);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CancelToken;
    use crate::pipeline::admission::Admission;
    use crossbeam_channel::unbounded;
    use std::path::Path;
    use std::sync::Arc;

    fn ctx(root: &str, policy: WalkPolicy, gate: Arc<Admission>) -> PipelineContext {
        PipelineContext {
            root: PathBuf::from(root),
            policy,
            gate,
        }
    }

    fn entry(path: &str, kind: EntryKind) -> WalkOutcome {
        WalkOutcome::Entry {
            path: PathBuf::from(path),
            kind,
        }
    }

    #[test]
    fn policy_skips_dirs_symlinks_and_special_by_default() {
        let policy = WalkPolicy::default();
        assert!(policy.admits(EntryKind::File));
        assert!(!policy.admits(EntryKind::Dir));
        assert!(!policy.admits(EntryKind::Symlink));
        assert!(!policy.admits(EntryKind::Special));
        let special = WalkPolicy {
            include_special: true,
            ..Default::default()
        };
        assert!(special.admits(EntryKind::Special));
    }

    #[test]
    fn walk_loop_emits_files_and_reports_errors() {
        let (task_tx, task_rx) = unbounded();
        let (outcome_tx, outcome_rx) = unbounded();
        let gate = Arc::new(Admission::new(CancelToken::new(), None));
        let policy = WalkPolicy {
            exclude: vec!["*.log".into()],
            ..Default::default()
        };
        let iter = vec![
            entry("/r", EntryKind::Dir),
            entry("/r/a.txt", EntryKind::File),
            entry("/r/debug.log", EntryKind::File),
            WalkOutcome::Err {
                msg: "Permission denied".into(),
                path: Some(PathBuf::from("/r/locked")),
            },
            WalkOutcome::Err {
                msg: "loop".into(),
                path: None,
            },
            entry("/r/sub/b.txt", EntryKind::File),
        ];
        let sent = run_walk_loop(task_tx, outcome_tx, &ctx("/r", policy, gate), iter.into_iter());
        assert_eq!(sent, 2);

        let tasks: Vec<_> = task_rx.iter().map(|t| t.path).collect();
        assert_eq!(
            tasks,
            vec![PathBuf::from("/r/a.txt"), PathBuf::from("/r/sub/b.txt")]
        );
        let failures: Vec<_> = outcome_rx.iter().collect();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].path(), Path::new("/r/locked"));
        assert_eq!(failures[1].path(), Path::new("/r"));
    }

    #[test]
    fn walk_loop_stops_when_gate_closed() {
        let (task_tx, task_rx) = unbounded();
        let (outcome_tx, _outcome_rx) = unbounded();
        let cancel = CancelToken::new();
        cancel.cancel();
        let gate = Arc::new(Admission::new(cancel, None));
        let iter = vec![entry("/r/a.txt", EntryKind::File)];
        let sent = run_walk_loop(
            task_tx,
            outcome_tx,
            &ctx("/r", WalkPolicy::default(), gate),
            iter.into_iter(),
        );
        assert_eq!(sent, 0);
        assert_eq!(task_rx.iter().count(), 0);
    }
}
