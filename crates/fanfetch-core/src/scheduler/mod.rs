//! Distributed job scheduler.
//!
//! Turns a chunk plan into local artifacts: admits queued jobs under each
//! worker's concurrency limit, runs the remote fetch, transfer-back and remote
//! delete of every job as tasks, and advances job state from their completion
//! events. Completion order is arbitrary; the merge step restores byte order.

mod event;
mod progress;
mod report;
mod run;
mod slots;

pub use progress::ProgressStats;
pub use report::{FailedJob, RunReport};
pub use run::JobScheduler;
pub use slots::WorkerSlots;
