//! Remote workers and their capacity.
//!
//! A worker is an ssh target that fetches byte ranges on our behalf. Workers are
//! discovered once at startup (tool probe + free-space probe) and never change
//! afterwards; the scheduler and planner share them read-only through
//! [`CapacityModel`].

mod capacity;
mod discover;

pub use capacity::CapacityModel;
pub use discover::{discover_workers, probe_resource_size, DiscoveryOptions};

use std::fmt;

/// Index of a worker in the [`CapacityModel`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub(crate) usize);

impl WorkerId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Range-capable fetch tool found on a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTool {
    Curl,
    Wget,
}

impl FetchTool {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchTool::Curl => "curl",
            FetchTool::Wget => "wget",
        }
    }
}

impl fmt::Display for FetchTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote host as seen after probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteWorker {
    /// Connection target passed verbatim to ssh/scp (e.g. `user@host`).
    pub target: String,
    pub tool: FetchTool,
    /// Bytes of chunk data the worker may hold at once.
    pub budget_bytes: u64,
    /// Maximum simultaneous remote fetches (at least 1).
    pub concurrency: usize,
}

impl RemoteWorker {
    pub fn new(
        target: impl Into<String>,
        tool: FetchTool,
        budget_bytes: u64,
        concurrency: usize,
    ) -> Self {
        Self {
            target: target.into(),
            tool,
            budget_bytes,
            concurrency: concurrency.max(1),
        }
    }
}
