//! End-of-run summary.

use std::time::Duration;

use crate::job::JobId;

/// A job that ended in `Failed`.
#[derive(Debug, Clone)]
pub struct FailedJob {
    pub job: JobId,
    pub artifact: String,
    pub error: String,
}

/// Final tally of a scheduler run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub total: usize,
    pub cleaned: usize,
    pub failed: Vec<FailedJob>,
    pub cancelled: usize,
    pub elapsed: Duration,
}

impl RunReport {
    /// True when every job reached `Cleaned`.
    pub fn is_complete(&self) -> bool {
        self.cleaned == self.total
    }
}
