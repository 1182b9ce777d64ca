//! Jobs: one byte range bound to one worker, tracked through its lifecycle.

mod error;
mod state;

pub use error::{InvalidTransition, JobError};
pub use state::JobState;

use std::fmt;

use tokio::task::AbortHandle;

use crate::merge::artifact_name;
use crate::planner::ByteRange;
use crate::worker::WorkerId;

/// Job identifier, unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub(crate) usize);

impl JobId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Unit of work owned by the scheduler.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    worker: WorkerId,
    range: ByteRange,
    /// File name used both on the worker and in the local chunk directory.
    artifact: String,
    state: JobState,
    /// Abort handle of the task currently driving this job (fetch, transfer or cleanup).
    in_flight: Option<AbortHandle>,
    error: Option<JobError>,
}

impl Job {
    pub(crate) fn new(id: JobId, worker: WorkerId, worker_slug: &str, range: ByteRange) -> Self {
        Self {
            id,
            worker,
            range,
            artifact: artifact_name(worker_slug, range),
            state: JobState::Queued,
            in_flight: None,
            error: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn range(&self) -> ByteRange {
        self.range
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    /// Moves to `to` if the state machine allows it.
    pub fn advance(&mut self, to: JobState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(to) {
            return Err(InvalidTransition {
                job: self.id,
                from: self.state,
                to,
            });
        }
        tracing::trace!(job = %self.id, from = self.state.as_str(), to = to.as_str(), "transition");
        self.state = to;
        if to.is_terminal() {
            self.in_flight = None;
        }
        Ok(())
    }

    /// Moves to `Failed`, recording why.
    pub fn fail(&mut self, error: JobError) -> Result<(), InvalidTransition> {
        self.advance(JobState::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    pub(crate) fn set_in_flight(&mut self, handle: AbortHandle) {
        self.in_flight = Some(handle);
    }

    pub(crate) fn clear_in_flight(&mut self) {
        self.in_flight = None;
    }

    /// Aborts the task driving this job, if any.
    pub(crate) fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
