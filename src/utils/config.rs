//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    /// `.filesig.toml`
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Worker threads ----

/// Limits for the worker pool size.
#[derive(Clone, Copy, Debug)]
pub struct WorkerLimits {
    /// Available threads (from rayon); set by [`WorkerLimits::current()`].
    pub all_threads: usize,
    /// Floor when nothing else is known.
    pub floor: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_THREADS,
        }
    }
}

impl WorkerLimits {
    pub const FLOOR_THREADS: usize = 1;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Default concurrency limit: available threads, never below the floor.
    pub fn default_jobs(&self) -> usize {
        self.all_threads.max(self.floor)
    }
}

// ---- Hashing ----

/// Hashing I/O buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// Read buffer per in-flight file (bytes). 64 KB.
    pub const READ_CHUNK_SIZE: usize = 64 * 1024;
    /// Pause before retrying a read that would block (fifos, devices).
    pub const WOULD_BLOCK_BACKOFF: Duration = Duration::from_millis(10);
}

// ---- Channel caps ----

/// Channel capacities, scaled by the worker count so pending work stays bounded.
pub struct ChannelCaps;

impl ChannelCaps {
    /// Tasks the walk may run ahead of the pool, per worker.
    pub const TASKS_PER_WORKER: usize = 4;
    /// Outcomes buffered ahead of the sink, per worker.
    pub const OUTCOMES_PER_WORKER: usize = 4;

    pub fn tasks(jobs: usize) -> usize {
        jobs.saturating_mul(Self::TASKS_PER_WORKER).max(1)
    }

    pub fn outcomes(jobs: usize) -> usize {
        jobs.saturating_mul(Self::OUTCOMES_PER_WORKER).max(1)
    }
}
