//! Filesig: concurrent file-checksum engine.
//!
//! A run walks a directory tree, hashes every regular file on a bounded worker pool,
//! and hands each [`Outcome`] to a single [`OutcomeSink`](report::OutcomeSink).
//! Per-file and per-directory errors are outcomes, not `Err`s; only configuration
//! problems (unknown algorithm, bad root, zero workers) abort a run.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use error::{ConfigError, FileError, Result, SignError};
pub use pipeline::CancelToken;

use log::debug;
use std::path::Path;

use crate::engine::digest::{DigestFn, resolve};
use crate::report::OutcomeSink;

/// Single entry point: hash every file under `root` with `opts.algorithm` and send each
/// outcome to `sink`.
///
/// Returns once the walk is exhausted and every admitted file has reported. A cancelled
/// or deadline-stopped run still returns `Ok` with [`RunReport::status`] set; use
/// [`RunReport::into_result`] to treat that as an error.
///
/// ```ignore
/// let opts = filesig::SignOpts { algorithm: filesig::Algorithm::Sha256, ..Default::default() };
/// let mut sink = filesig::report::CollectSink::new();
/// let report = filesig::sign_dir(path, &opts, &filesig::CancelToken::new(), &mut sink)?;
/// ```
pub fn sign_dir<S>(
    root: &Path,
    opts: &SignOpts,
    cancel: &CancelToken,
    sink: &mut S,
) -> Result<RunReport>
where
    S: OutcomeSink + ?Sized,
{
    debug!("sign_dir: {} ({})", root.display(), opts.algorithm);
    sign_dir_with(root, opts, resolve(opts.algorithm), cancel, sink)
}

/// Same as [`sign_dir`] with a caller-supplied digest function (resolved once, passed explicitly).
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
    pipeline::sign_dir_with(root, opts, digest, cancel, sink)
}

/// Convenience: run to completion and return outcomes sorted by path.
pub fn sign_dir_sorted(root: &Path, opts: &SignOpts) -> Result<(Vec<Outcome>, RunReport)> {
    let mut sink = report::CollectSink::new();
    let report = sign_dir(root, opts, &CancelToken::new(), &mut sink)?;
    Ok((sink.sorted(), report))
}
