//! Error taxonomy for a signing run.
//!
//! Only [`ConfigError`] stops a run before it starts. Per-file and per-directory
//! problems never become an `Err`; they travel as [`Outcome::Failure`](crate::Outcome)
//! values through the fan-in and are counted in the run summary.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::FailureKind;

/// Result alias used by the public filesig API.
pub type Result<T> = std::result::Result<T, SignError>;

/// Fatal errors detected before any traversal or hashing happens.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown algorithm '{id}' (expected one of: {expected})")]
    UnknownAlgorithm { id: String, expected: String },

    #[error("root does not exist: {path}")]
    RootNotFound { path: PathBuf },

    #[error("root is not a directory: {path}")]
    RootNotDirectory { path: PathBuf },

    #[error("cannot read root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("concurrency limit must be at least 1 (got {value})")]
    InvalidConcurrency { value: usize },
}

/// Top-level error for [`sign_dir`](crate::sign_dir).
#[derive(Error, Debug)]
pub enum SignError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("run cancelled after {succeeded} succeeded and {failed} failed")]
    Cancelled { succeeded: usize, failed: usize },

    #[error("run deadline exceeded after {succeeded} succeeded and {failed} failed")]
    DeadlineExceeded { succeeded: usize, failed: usize },

    #[error("result sink failed: {0}")]
    Sink(#[source] std::io::Error),

    #[error("{0} thread panicked")]
    Thread(&'static str),
}

/// Why a single file could not be digested.
#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

impl FileError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FileError::Io(_) => FailureKind::Read,
            FileError::TimedOut(_) => FailureKind::Timeout,
        }
    }
}
