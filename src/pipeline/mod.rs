//! Pipeline components: task source (walk), admission gate, worker pool, fan-in.

pub mod admission;
pub mod context;
pub mod orchestrator;
pub mod walk;
pub mod workers;

pub use admission::{Admission, CancelToken, InFlight};
pub use context::{
    PipelineChannels, PipelineContext, PipelineHandles, PipelineTuning, create_pipeline_channels,
};
pub use orchestrator::{drain_pipeline, run_pipeline, sign_dir_with};
pub use walk::{
    EntryKind, WalkOutcome, run_walk_loop, spawn_walk_thread, to_outcomes_jwalk,
    to_outcome_walkdir,
};
pub use workers::{run_task, spawn_workers};
