//! Whole-download orchestration: discover workers, size the resource, plan,
//! schedule, then merge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::FanfetchConfig;
use crate::merge::{merge_chunks, MergeReport};
use crate::planner::plan_chunks;
use crate::remote::{FetchRequest, RemoteExecutor};
use crate::scheduler::{JobScheduler, ProgressStats, RunReport};
use crate::url_model::output_filename;
use crate::worker::{discover_workers, probe_resource_size, DiscoveryOptions};

/// Everything one `get` needs.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub url: String,
    /// Extra header lines forwarded to every fetch.
    pub headers: Vec<String>,
    /// ssh targets, in the order ranges are dealt out.
    pub targets: Vec<String>,
    /// Chunk directory; the merged file is written here too.
    pub output_dir: PathBuf,
    /// Merged file name; derived from the URL when `None`.
    pub output_name: Option<String>,
    pub chunks: usize,
    pub discovery: DiscoveryOptions,
}

impl DownloadOptions {
    pub fn from_config(
        cfg: &FanfetchConfig,
        url: impl Into<String>,
        targets: Vec<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            targets,
            output_dir: output_dir.into(),
            output_name: None,
            chunks: cfg.chunks,
            discovery: DiscoveryOptions::from_config(cfg),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        let name = self
            .output_name
            .clone()
            .unwrap_or_else(|| output_filename(&self.url));
        self.output_dir.join(name)
    }
}

/// Result of [`run_download`].
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub total_size: u64,
    /// Number of planned chunks.
    pub plan_len: usize,
    pub run: RunReport,
    /// Planned artifacts found in the chunk directory after the run.
    pub artifacts_present: usize,
    /// `None` when the merge was skipped because chunks were missing.
    pub merge: Option<MergeReport>,
    pub output_path: PathBuf,
}

impl DownloadOutcome {
    /// Planned chunks that did not complete. A chunk counts only when its job
    /// reached `Cleaned` and its file is present.
    pub fn shortfall(&self) -> usize {
        let complete = self.run.cleaned.min(self.artifacts_present);
        self.plan_len.saturating_sub(complete)
    }

    /// All chunks arrived, were merged, and the size matched.
    pub fn is_success(&self) -> bool {
        self.shortfall() == 0
            && self
                .merge
                .as_ref()
                .is_some_and(|m| m.size_matches() != Some(false))
    }
}

/// Runs one download end to end.
///
/// Planning errors abort before any remote work starts. Job failures do not:
/// the run finishes, and if any chunk is missing the merge is skipped so the
/// chunk files stay in `output_dir` for inspection or a later `merge`.
pub async fn run_download<E: RemoteExecutor>(
    executor: Arc<E>,
    opts: &DownloadOptions,
    progress_tx: Option<watch::Sender<ProgressStats>>,
    cancel: CancellationToken,
) -> Result<DownloadOutcome> {
    let request = FetchRequest::new(opts.url.clone(), opts.headers.iter().cloned());

    let model = discover_workers(&executor, &opts.targets, &opts.discovery).await?;
    let total_size = probe_resource_size(&*executor, &model, &request).await?;
    let plan = plan_chunks(total_size, opts.chunks, &model)?;
    tracing::info!(
        total_size,
        chunks = plan.len(),
        base_chunk = plan.base_chunk_size(),
        "planned download"
    );

    std::fs::create_dir_all(&opts.output_dir).with_context(|| {
        format!(
            "failed to create output directory: {}",
            opts.output_dir.display()
        )
    })?;

    let mut scheduler = JobScheduler::new(
        executor,
        Arc::new(model),
        &plan,
        request,
        opts.output_dir.clone(),
    )
    .with_cancellation(cancel);
    if let Some(tx) = progress_tx {
        scheduler = scheduler.with_progress(tx);
    }
    let run = scheduler.run().await;
    let artifacts_present = scheduler
        .jobs()
        .iter()
        .filter(|j| opts.output_dir.join(j.artifact()).is_file())
        .count();
    drop(scheduler);

    let output_path = opts.output_path();
    tracing::info!(
        expected = plan.len(),
        present = artifacts_present,
        cleaned = run.cleaned,
        "chunk files present"
    );

    let merge = if run.is_complete() && artifacts_present == plan.len() {
        Some(merge_in_background(&opts.output_dir, &output_path, Some(total_size)).await?)
    } else {
        tracing::warn!(
            missing = plan.len().saturating_sub(run.cleaned.min(artifacts_present)),
            dir = %opts.output_dir.display(),
            "chunks missing, skipping merge and keeping chunk files"
        );
        None
    };

    Ok(DownloadOutcome {
        total_size,
        plan_len: plan.len(),
        run,
        artifacts_present,
        merge,
        output_path,
    })
}

/// Merge-only mode: assemble whatever artifacts `dir` holds, without a size check.
pub async fn merge_directory(dir: &Path, name: &str) -> Result<MergeReport> {
    merge_in_background(dir, &dir.join(name), None).await
}

async fn merge_in_background(
    dir: &Path,
    output: &Path,
    expected: Option<u64>,
) -> Result<MergeReport> {
    let dir = dir.to_path_buf();
    let output = output.to_path_buf();
    tokio::task::spawn_blocking(move || merge_chunks(&dir, &output, expected))
        .await
        .context("merge task panicked")?
}
