//! Offset-ordered reassembly of chunk artifacts into the final file.

mod artifact;

pub use artifact::{artifact_name, artifact_start, count_artifacts, list_artifacts, ARTIFACT_PREFIX};

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// What a merge produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub output: PathBuf,
    /// Number of artifacts appended (and deleted).
    pub chunks: usize,
    pub bytes_written: u64,
    /// Expected size; `None` in merge-only mode.
    pub expected_size: Option<u64>,
}

impl MergeReport {
    /// `None` when there was nothing to compare against.
    pub fn size_matches(&self) -> Option<bool> {
        self.expected_size.map(|e| e == self.bytes_written)
    }
}

/// Concatenates every artifact in `chunk_dir` into `output` in ascending start
/// offset order, deleting each artifact once appended.
///
/// A size different from `expected_size` is logged and reported, not treated
/// as an error: a partial file can still be useful. Two artifacts claiming the
/// same start offset abort the merge before anything is written.
pub fn merge_chunks(
    chunk_dir: &Path,
    output: &Path,
    expected_size: Option<u64>,
) -> Result<MergeReport> {
    let mut artifacts = list_artifacts(chunk_dir)
        .with_context(|| format!("list chunk directory {}", chunk_dir.display()))?;
    artifacts.retain(|(_, p)| p != output);
    artifacts.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    if let Some(pair) = artifacts.windows(2).find(|w| w[0].0 == w[1].0) {
        anyhow::bail!(
            "chunks {} and {} both start at offset {}",
            pair[0].1.display(),
            pair[1].1.display(),
            pair[0].0
        );
    }
    tracing::debug!(
        chunks = artifacts.len(),
        order = ?artifacts.iter().map(|(s, _)| *s).collect::<Vec<_>>(),
        "merging chunks"
    );

    let mut dest = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(output)
        .with_context(|| format!("failed to create output file: {}", output.display()))?;

    let mut bytes_written = 0u64;
    for (_, path) in &artifacts {
        let mut src = File::open(path)
            .with_context(|| format!("failed to open chunk: {}", path.display()))?;
        bytes_written += io::copy(&mut src, &mut dest)
            .with_context(|| format!("failed to append chunk: {}", path.display()))?;
        drop(src);
        std::fs::remove_file(path)
            .with_context(|| format!("failed to remove merged chunk: {}", path.display()))?;
    }
    dest.flush()?;
    dest.sync_all().context("output sync failed")?;

    let report = MergeReport {
        output: output.to_path_buf(),
        chunks: artifacts.len(),
        bytes_written,
        expected_size,
    };
    if report.size_matches() == Some(false) {
        tracing::warn!(
            expected = expected_size,
            actual = bytes_written,
            "file size doesn't match, something went wrong"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ByteRange;

    fn body() -> Vec<u8> {
        (0..=255u8).cycle().take(1000).collect()
    }

    /// Writes the 3 chunks of `body` in `order`.
    fn write_chunks(dir: &Path, body: &[u8], order: &[usize]) {
        let ranges = [
            ByteRange::new(0, Some(332)).unwrap(),
            ByteRange::new(333, Some(665)).unwrap(),
            ByteRange::open(666),
        ];
        let slugs = ["b", "a", "c"];
        for &i in order {
            let r = ranges[i];
            let end = r.last_byte(body.len() as u64) as usize;
            let name = artifact_name(slugs[i], r);
            std::fs::write(dir.join(name), &body[r.start() as usize..=end]).unwrap();
        }
    }

    #[test]
    fn merge_is_independent_of_completion_order() {
        let body = body();
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for order in orders {
            let dir = tempfile::tempdir().unwrap();
            write_chunks(dir.path(), &body, &order);
            let out = dir.path().join("file.bin");
            let report = merge_chunks(dir.path(), &out, Some(1000)).unwrap();
            assert_eq!(report.chunks, 3);
            assert_eq!(report.size_matches(), Some(true));
            assert_eq!(std::fs::read(&out).unwrap(), body, "order {:?}", order);
            assert_eq!(count_artifacts(dir.path()).unwrap(), 0);
        }
    }

    #[test]
    fn offsets_sort_numerically_not_lexically() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ff-h_9-9"), b"a").unwrap();
        std::fs::write(dir.path().join("ff-h_10-10"), b"b").unwrap();
        std::fs::write(dir.path().join("ff-h_100-"), b"c").unwrap();
        let out = dir.path().join("out");
        merge_chunks(dir.path(), &out, None).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"abc");
    }

    #[test]
    fn size_mismatch_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ff-h_0-4"), b"hello").unwrap();
        let out = dir.path().join("out");
        let report = merge_chunks(dir.path(), &out, Some(10)).unwrap();
        assert_eq!(report.bytes_written, 5);
        assert_eq!(report.size_matches(), Some(false));
    }

    #[test]
    fn merge_only_skips_size_check() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ff-h_0-"), b"abc").unwrap();
        let report = merge_chunks(dir.path(), &dir.path().join("o"), None).unwrap();
        assert_eq!(report.size_matches(), None);
    }

    #[test]
    fn duplicate_start_offsets_abort() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ff-a_0-4"), b"hello").unwrap();
        std::fs::write(dir.path().join("ff-b_0-"), b"other").unwrap();
        let out = dir.path().join("out");
        assert!(merge_chunks(dir.path(), &out, None).is_err());
        assert!(!out.exists());
        assert_eq!(count_artifacts(dir.path()).unwrap(), 2);
    }
}
