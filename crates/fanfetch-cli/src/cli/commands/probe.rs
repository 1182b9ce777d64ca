//! `fanfetch probe` – show what each worker offers before committing to a download.

use anyhow::Result;
use fanfetch_core::config::FanfetchConfig;
use fanfetch_core::remote::{FetchRequest, SshExecutor};
use fanfetch_core::worker::{discover_workers, probe_resource_size, DiscoveryOptions};
use std::sync::Arc;

/// Workers whose largest chunk is below this turn a download into many tiny ssh jobs.
const SMALL_CHUNK_BYTES: u64 = 1_048_576;

pub async fn run_probe(
    cfg: &FanfetchConfig,
    remotes: &[String],
    url: Option<&str>,
    headers: Vec<String>,
) -> Result<()> {
    if remotes.is_empty() {
        anyhow::bail!("no remotes specified");
    }
    let executor = Arc::new(SshExecutor::new(cfg.ssh_or_default()));
    let opts = DiscoveryOptions::from_config(cfg);
    let model = discover_workers(&executor, remotes, &opts).await?;

    println!("{:<32} {:<6} {:>14} {:>14}", "WORKER", "TOOL", "BUDGET", "MAX CHUNK");
    for (id, w) in model.iter() {
        println!(
            "{:<32} {:<6} {:>14} {:>14}",
            w.target,
            w.tool.as_str(),
            w.budget_bytes,
            model.subchunk_size(id)
        );
    }

    for (id, w) in model.iter() {
        if model.subchunk_size(id) < SMALL_CHUNK_BYTES {
            println!(
                "warning: {} can hold only {} bytes per concurrent fetch; large files will be split into many small chunks",
                w.target,
                model.subchunk_size(id)
            );
        }
    }

    if let Some(url) = url {
        let request = FetchRequest::new(url, headers);
        let size = probe_resource_size(&*executor, &model, &request).await?;
        println!("resource size: {} bytes", size);
    }
    Ok(())
}
