//! `fanfetch merge` – assemble chunk files already present in a directory.

use anyhow::Result;
use fanfetch_core::pipeline;
use std::path::Path;

pub async fn run_merge(dir: &Path, name: &str) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }
    let report = pipeline::merge_directory(dir, name).await?;
    if report.chunks == 0 {
        anyhow::bail!("no chunk files found in {}", dir.display());
    }
    println!(
        "merged {} chunk(s), {} bytes into {}",
        report.chunks,
        report.bytes_written,
        report.output.display()
    );
    Ok(())
}
