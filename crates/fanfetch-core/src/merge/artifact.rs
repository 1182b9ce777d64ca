//! Chunk artifact naming: `ff-<worker-slug>_<start>-<end>`.
//!
//! The same name is used for the worker-side file and the local copy, so a
//! directory listing is enough to recover each chunk's start offset.

use std::io;
use std::path::{Path, PathBuf};

use crate::planner::ByteRange;

pub const ARTIFACT_PREFIX: &str = "ff-";

/// Name of the artifact holding `range` fetched by the worker with `worker_slug`.
pub fn artifact_name(worker_slug: &str, range: ByteRange) -> String {
    format!("{}{}_{}", ARTIFACT_PREFIX, worker_slug, range)
}

/// Start offset encoded in an artifact name, or `None` for foreign files.
pub fn artifact_start(name: &str) -> Option<u64> {
    let rest = name.strip_prefix(ARTIFACT_PREFIX)?;
    let (_, range) = rest.rsplit_once('_')?;
    ByteRange::parse(range).map(|r| r.start())
}

/// Chunk artifacts in `dir` as `(start offset, path)`, unsorted.
pub fn list_artifacts(dir: &Path) -> io::Result<Vec<(u64, PathBuf)>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        match artifact_start(name) {
            Some(start) => out.push((start, entry.path())),
            None if name.starts_with(ARTIFACT_PREFIX) => {
                tracing::debug!(file = %name, "ignoring file with unparsable chunk name");
            }
            None => {}
        }
    }
    Ok(out)
}

/// Number of chunk artifacts present in `dir`.
pub fn count_artifacts(dir: &Path) -> io::Result<usize> {
    Ok(list_artifacts(dir)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_start_roundtrip() {
        let r = ByteRange::new(500, Some(749)).unwrap();
        let name = artifact_name("user-host", r);
        assert_eq!(name, "ff-user-host_500-749");
        assert_eq!(artifact_start(&name), Some(500));
        assert_eq!(artifact_start("ff-h_750-"), Some(750));
    }

    #[test]
    fn foreign_names_rejected() {
        assert_eq!(artifact_start("file.iso"), None);
        assert_eq!(artifact_start("ff-download-1700000000"), None);
        assert_eq!(artifact_start("ff-h_abc-"), None);
    }

    #[test]
    fn list_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ff-a_0-9"), b"x").unwrap();
        std::fs::write(dir.path().join("ff-b_10-"), b"y").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"z").unwrap();
        std::fs::create_dir(dir.path().join("ff-c_20-29")).unwrap();
        let mut found = list_artifacts(dir.path()).unwrap();
        found.sort();
        let starts: Vec<u64> = found.iter().map(|(s, _)| *s).collect();
        assert_eq!(starts, vec![0, 10]);
        assert_eq!(count_artifacts(dir.path()).unwrap(), 2);
    }
}
