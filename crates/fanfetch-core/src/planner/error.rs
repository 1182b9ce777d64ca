//! Errors that abort a run before any remote work starts.

/// Fatal problem found while probing workers or planning chunks.
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    #[error("no workers given")]
    NoWorkers,
    #[error("worker {target}: neither curl nor wget is available")]
    NoRangeTool { target: String },
    #[error("worker {target}: probe failed: {reason}")]
    ProbeFailed { target: String, reason: String },
    #[error("could not determine resource size: {0}")]
    SizeUnknown(String),
    #[error("resource size must be greater than zero")]
    EmptyResource,
    #[error("target chunk count must be greater than zero")]
    ZeroChunks,
    #[error("no worker has storage for even one byte per concurrent fetch")]
    NoCapacity,
    #[error("invalid byte range {start}-{end}")]
    InvalidRange { start: u64, end: u64 },
}
