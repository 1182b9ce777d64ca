//! Remote execution boundary.
//!
//! The scheduler only talks to workers through [`RemoteExecutor`]. The
//! production implementation, [`SshExecutor`], shells out to `ssh` and `scp`;
//! tests substitute an in-process fake.

mod command;
mod parse;
mod ssh;

pub use command::shell_quote;
pub use parse::{parse_content_length, parse_df_available, parse_tool_probe};
pub use ssh::SshExecutor;

use std::future::Future;
use std::path::Path;

use anyhow::Result;

use crate::planner::ByteRange;
use crate::worker::FetchTool;

/// URL plus extra request headers forwarded to the fetch tool on every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Complete header lines, e.g. `Cookie: a=b`.
    pub headers: Vec<String>,
}

impl FetchRequest {
    /// Builds a request, dropping user `Range` headers (ranges are set per chunk).
    pub fn new(url: impl Into<String>, headers: impl IntoIterator<Item = String>) -> Self {
        let headers = headers
            .into_iter()
            .filter(|h| {
                let is_range = h
                    .split_once(':')
                    .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case("range"));
                if is_range {
                    tracing::warn!(header = %h, "Range header can't be added, skipping");
                }
                !is_range
            })
            .collect();
        Self {
            url: url.into(),
            headers,
        }
    }
}

/// Exit status and diagnostics of one external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code; `None` if the process was killed by a signal.
    pub code: Option<i32>,
    /// Trimmed stderr, for error reports.
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Operations the core needs from the remote side.
///
/// `Err` means the local process could not be run at all; a process that ran
/// and exited non-zero is reported through [`CommandOutcome`].
pub trait RemoteExecutor: Send + Sync + 'static {
    /// Which range-capable tool the worker has (curl preferred), if any.
    fn probe_tool(&self, target: &str) -> impl Future<Output = Result<Option<FetchTool>>> + Send;

    /// Free bytes in the worker's working directory.
    fn free_space(&self, target: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Size of the resource from a header-only request issued on the worker.
    fn resource_size(
        &self,
        target: &str,
        tool: FetchTool,
        request: &FetchRequest,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Fetches `range` into the worker-side file `artifact`.
    fn fetch_range(
        &self,
        target: &str,
        tool: FetchTool,
        request: &FetchRequest,
        range: ByteRange,
        artifact: &str,
    ) -> impl Future<Output = Result<CommandOutcome>> + Send;

    /// Copies the worker-side `artifact` into `local_dir`.
    fn transfer_back(
        &self,
        target: &str,
        artifact: &str,
        local_dir: &Path,
    ) -> impl Future<Output = Result<CommandOutcome>> + Send;

    /// Deletes the worker-side `artifact`.
    fn remote_delete(
        &self,
        target: &str,
        artifact: &str,
    ) -> impl Future<Output = Result<CommandOutcome>> + Send;
}
