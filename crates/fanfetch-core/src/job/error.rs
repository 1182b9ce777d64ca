//! Per-job failures and state machine violations.

use super::{JobId, JobState};

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    /// Remote fetch exited non-zero (or was killed: `code == None`).
    #[error("remote fetch exited with {code:?}: {stderr}")]
    RemoteExecution { code: Option<i32>, stderr: String },
    /// Transfer-back exited non-zero.
    #[error("transfer-back exited with {code:?}: {stderr}")]
    Transfer { code: Option<i32>, stderr: String },
    /// The local ssh/scp process could not be started.
    #[error("could not start process: {0}")]
    Spawn(String),
    /// The task driving the job disappeared without reporting back.
    #[error("job stalled: {0}")]
    Stalled(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{job}: illegal transition {} -> {}", from.as_str(), to.as_str())]
pub struct InvalidTransition {
    pub job: JobId,
    pub from: JobState,
    pub to: JobState,
}
