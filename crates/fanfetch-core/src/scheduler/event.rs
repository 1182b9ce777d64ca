//! Completion events sent from job tasks to the scheduler loop.

use crate::job::JobId;
use crate::remote::CommandOutcome;

/// Result of one finished external operation.
#[derive(Debug)]
pub(crate) enum JobEvent {
    RemoteFinished {
        job: JobId,
        outcome: anyhow::Result<CommandOutcome>,
    },
    TransferFinished {
        job: JobId,
        outcome: anyhow::Result<CommandOutcome>,
    },
    CleanupFinished {
        job: JobId,
        outcome: anyhow::Result<CommandOutcome>,
    },
    /// Remote delete of a failed fetch's leftover output.
    DiscardFinished {
        job: JobId,
        outcome: anyhow::Result<CommandOutcome>,
    },
}
