//! Watch core: job records, the job store and the pure change evaluator.
mod evaluate;
mod job;
mod store;

pub use evaluate::{evaluate, preview, trigger_matches, Evaluation};
pub use job::{
    JobId, JobStatus, JobSubmission, SelectorKind, ValidationError, WatchJob, INITIAL_MESSAGE,
};
pub use store::JobStore;
