//! Public and internal types for the filesig API and pipeline.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, SignError};

/// Hash algorithm used for every file in a run. Parsed once, before any traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Crc32,
    #[default]
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Blake3,
}

impl Algorithm {
    pub fn all() -> &'static [Algorithm] {
        &[
            Algorithm::Crc32,
            Algorithm::Md5,
            Algorithm::Sha1,
            Algorithm::Sha256,
            Algorithm::Sha512,
            Algorithm::Blake3,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Crc32 => "crc32",
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
            Algorithm::Blake3 => "blake3",
        }
    }

    /// Length of the hex digest this algorithm produces.
    pub fn hex_len(self) -> usize {
        match self {
            Algorithm::Crc32 => 8,
            Algorithm::Md5 => 32,
            Algorithm::Sha1 => 40,
            Algorithm::Sha256 | Algorithm::Blake3 => 64,
            Algorithm::Sha512 => 128,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase();
        let algo = match id.as_str() {
            "crc" | "crc32" => Algorithm::Crc32,
            "md5" => Algorithm::Md5,
            "sha1" => Algorithm::Sha1,
            "sha256" => Algorithm::Sha256,
            "sha512" => Algorithm::Sha512,
            "blake3" => Algorithm::Blake3,
            _ => {
                let expected = Algorithm::all()
                    .iter()
                    .map(|a| a.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(ConfigError::UnknownAlgorithm {
                    id: s.to_string(),
                    expected,
                });
            }
        };
        Ok(algo)
    }
}

/// One file to hash. Created by the walk, consumed exactly once by a worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub path: PathBuf,
}

impl Task {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Class of a per-item failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// A directory could not be entered or listed.
    Traversal,
    /// A file could not be opened or read.
    Read,
    /// A file did not finish within the per-file timeout.
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Traversal => "traversal",
            FailureKind::Read => "read",
            FailureKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Result of processing one task (or one failed directory).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success {
        path: PathBuf,
        digest: String,
    },
    Failure {
        path: PathBuf,
        kind: FailureKind,
        message: String,
    },
}

impl Outcome {
    pub fn failure(path: PathBuf, kind: FailureKind, message: impl Into<String>) -> Self {
        Outcome::Failure {
            path,
            kind,
            message: message.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Outcome::Success { path, .. } | Outcome::Failure { path, .. } => path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Success/failure counts for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &Outcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// How a run ended once the pool drained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Completed,
    Cancelled,
    DeadlineExceeded,
}

/// Everything known about a finished run.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub summary: Summary,
    pub status: RunStatus,
    /// Tasks the walk handed to the pool.
    pub emitted: usize,
    /// Tasks received after admission closed and therefore never hashed.
    pub not_admitted: usize,
    /// Highest number of digests that ran at the same time.
    pub peak_in_flight: usize,
    pub elapsed: Duration,
}

impl RunReport {
    /// Exit status for the CLI: 0 ok, 1 per-file failures (when `fail_on_error`), 130 stopped.
    pub fn exit_code(&self, fail_on_error: bool) -> u8 {
        match self.status {
            RunStatus::Cancelled | RunStatus::DeadlineExceeded => 130,
            RunStatus::Completed if fail_on_error && self.summary.failed > 0 => 1,
            RunStatus::Completed => 0,
        }
    }

    /// Turn a stopped run into an error; a completed run (even with failures) is `Ok`.
    pub fn into_result(self) -> crate::Result<RunReport> {
        let Summary { succeeded, failed } = self.summary;
        match self.status {
            RunStatus::Completed => Ok(self),
            RunStatus::Cancelled => Err(SignError::Cancelled { succeeded, failed }),
            RunStatus::DeadlineExceeded => Err(SignError::DeadlineExceeded { succeeded, failed }),
        }
    }
}

/// Which walk entries become tasks.
#[derive(Clone, Debug, Default)]
pub struct WalkPolicy {
    /// Follow symbolic links (the target's type decides whether it is hashed).
    pub follow_links: bool,
    /// Hash non-regular files (fifos, devices, sockets) too.
    pub include_special: bool,
    /// Exclude patterns (glob syntax) matched against names and root-relative paths.
    pub exclude: Vec<String>,
}

/// Options for one [`sign_dir`](crate::sign_dir) run. Passed explicitly; nothing is read from ambient state.
#[derive(Clone, Debug, Default)]
pub struct SignOpts {
    pub algorithm: Algorithm,
    /// Concurrency limit. When None, derived from available threads and the FD limit.
    pub jobs: Option<usize>,
    pub policy: WalkPolicy,
    /// Per-file timeout; an expired file becomes a timeout failure.
    pub file_timeout: Option<Duration>,
    /// Whole-run deadline, checked at admission.
    pub run_deadline: Option<Duration>,
    /// Use the rayon-backed parallel walk (jwalk) instead of walkdir.
    pub parallel_walk: bool,
}

/// How the CLI renders outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}' (expected text or json)")),
        }
    }
}

/// Full options (CLI). Use [`SignOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    pub algorithm: Algorithm,
    pub jobs: Option<usize>,
    pub follow_links: bool,
    pub include_special: bool,
    pub exclude: Vec<String>,
    /// Per-file timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Whole-run deadline in seconds.
    pub deadline_secs: Option<u64>,
    /// Buffer outcomes and print them sorted by path once the pool drains.
    pub sorted: bool,
    pub format: OutputFormat,
    /// Exit non-zero when any file failed.
    pub fail_on_error: bool,
    pub parallel_walk: bool,
    pub verbose: bool,
    /// Show a progress counter on stderr.
    pub progress: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            jobs: None,
            follow_links: false,
            include_special: false,
            exclude: Vec::new(),
            timeout_secs: None,
            deadline_secs: None,
            sorted: false,
            format: OutputFormat::default(),
            fail_on_error: true,
            parallel_walk: false,
            verbose: false,
            progress: false,
        }
    }
}

impl From<&Opts> for SignOpts {
    fn from(o: &Opts) -> Self {
        SignOpts {
            algorithm: o.algorithm,
            jobs: o.jobs,
            policy: WalkPolicy {
                follow_links: o.follow_links,
                include_special: o.include_special,
                exclude: o.exclude.clone(),
            },
            file_timeout: o.timeout_secs.map(Duration::from_secs),
            run_deadline: o.deadline_secs.map(Duration::from_secs),
            parallel_walk: o.parallel_walk,
        }
    }
}
