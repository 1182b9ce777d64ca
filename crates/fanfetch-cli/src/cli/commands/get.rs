//! `fanfetch get` – full pipeline: probe, plan, fetch through workers, merge.

use anyhow::{Context, Result};
use fanfetch_core::config::FanfetchConfig;
use fanfetch_core::pipeline::{self, DownloadOptions, DownloadOutcome};
use fanfetch_core::remote::SshExecutor;
use fanfetch_core::scheduler::ProgressStats;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Parsed `get` arguments; `None` fields fall back to config.
#[derive(Debug, Clone)]
pub struct GetArgs {
    pub url: String,
    pub remotes: Vec<String>,
    pub headers: Vec<String>,
    pub output: Option<PathBuf>,
    pub chunks: Option<usize>,
    pub threads: Option<usize>,
}

const PROGRESS_INTERVAL_MS: u64 = 500;

fn default_output_dir() -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from(format!("ff-download-{}", ts))
}

fn build_options(cfg: &FanfetchConfig, args: GetArgs) -> DownloadOptions {
    let output_dir = args.output.unwrap_or_else(default_output_dir);
    let mut opts = DownloadOptions::from_config(cfg, args.url, args.remotes, output_dir);
    opts.headers = args.headers;
    if let Some(n) = args.chunks {
        opts.chunks = n;
    }
    if let Some(t) = args.threads {
        opts.discovery.concurrency = t.max(1);
    }
    opts
}

pub async fn run_get(cfg: &FanfetchConfig, args: GetArgs) -> Result<()> {
    if args.remotes.is_empty() {
        anyhow::bail!("no remotes specified");
    }
    let opts = build_options(cfg, args);
    std::fs::create_dir(&opts.output_dir).with_context(|| {
        format!(
            "failed to create output directory {} (it must not exist)",
            opts.output_dir.display()
        )
    })?;
    println!("getting url: {}", opts.url);

    let executor = Arc::new(SshExecutor::new(cfg.ssh_or_default()));

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ninterrupted, stopping workers...");
                cancel.cancel();
            }
        })
    };

    let (progress_tx, mut progress_rx) = tokio::sync::watch::channel(ProgressStats::default());
    let progress_handle = tokio::spawn(async move {
        let mut last_print = Instant::now();
        while progress_rx.changed().await.is_ok() {
            let stats = progress_rx.borrow_and_update().clone();
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || stats.jobs_cleaned >= stats.job_count
            {
                let done_mib = stats.bytes_done as f64 / 1_048_576.0;
                let total_mib = stats.total_bytes as f64 / 1_048_576.0;
                let rate_mib = stats.bytes_per_sec() / 1_048_576.0;
                let eta = stats
                    .eta_secs()
                    .map(|s| format!("{:.0}s", s))
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "  TOTAL PROGRESS: {:.2}%  {}/{} chunks  {:.1} / {:.1} MiB  {:.2} MiB/s  ETA {}",
                    stats.fraction() * 100.0,
                    stats.jobs_cleaned,
                    stats.job_count,
                    done_mib,
                    total_mib,
                    rate_mib,
                    eta
                );
                last_print = now;
            }
        }
    });

    let result = pipeline::run_download(executor, &opts, Some(progress_tx), cancel.clone()).await;
    ctrl_c.abort();
    let _ = progress_handle.await;
    let outcome = result?;

    print_summary(&outcome);
    if cancel.is_cancelled() {
        anyhow::bail!(
            "download cancelled; chunk files kept in {}",
            opts.output_dir.display()
        );
    }
    check_outcome(&outcome)
}

fn print_summary(outcome: &DownloadOutcome) {
    for failed in &outcome.run.failed {
        eprintln!("{} ({}) failed: {}", failed.job, failed.artifact, failed.error);
    }
    println!(
        "chunk files present: {} of {}",
        outcome.artifacts_present, outcome.plan_len
    );
    if let Some(merge) = &outcome.merge {
        println!(
            "DONE: output written to {}, {} bytes, elapsed {:.1} minutes",
            merge.output.display(),
            merge.bytes_written,
            outcome.run.elapsed.as_secs_f64() / 60.0
        );
    }
}

/// Non-zero exit on missing chunks or a size mismatch.
fn check_outcome(outcome: &DownloadOutcome) -> Result<()> {
    if outcome.shortfall() > 0 {
        anyhow::bail!(
            "something went wrong and {} chunk file(s) are still missing; run `fanfetch merge {}` once they are in place",
            outcome.shortfall(),
            outcome
                .output_path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        );
    }
    match &outcome.merge {
        Some(m) if m.size_matches() == Some(false) => anyhow::bail!(
            "file size doesn't match: expected {} bytes, wrote {}",
            outcome.total_size,
            m.bytes_written
        ),
        Some(_) => Ok(()),
        None => anyhow::bail!("merge did not run"),
    }
}
