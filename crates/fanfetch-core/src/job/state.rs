/// Lifecycle of a job.
///
/// `Queued → RemoteRunning → RemoteDone → TransferRunning → TransferDone → Cleaned`,
/// with terminal `Failed` and `Cancelled` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    RemoteRunning,
    RemoteDone,
    TransferRunning,
    TransferDone,
    Cleaned,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::RemoteRunning => "remote-running",
            JobState::RemoteDone => "remote-done",
            JobState::TransferRunning => "transfer-running",
            JobState::TransferDone => "transfer-done",
            JobState::Cleaned => "cleaned",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Cleaned | JobState::Failed | JobState::Cancelled
        )
    }

    pub fn can_transition_to(self, to: JobState) -> bool {
        use JobState::*;
        match (self, to) {
            (Queued, RemoteRunning)
            | (RemoteRunning, RemoteDone)
            | (RemoteDone, TransferRunning)
            | (TransferRunning, TransferDone)
            | (TransferDone, Cleaned) => true,
            (from, Failed | Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}
