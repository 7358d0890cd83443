//! Locating the video a pipeline run produced.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

/// A candidate output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl Artifact {
    /// Whether the file was last written before `instant`, i.e. it cannot
    /// be the product of work that started then.
    pub fn predates(&self, instant: SystemTime) -> bool {
        self.modified < instant
    }
}

/// The most recently modified regular file in `dir` whose name contains
/// `marker`. Ties keep the first one seen in directory order.
///
/// A missing directory or no match is `Ok(None)`, not an error.
pub async fn find_latest(dir: &Path, marker: &str) -> Result<Option<Artifact>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to list {}", dir.display())),
    };

    let mut latest: Option<Artifact> = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?
    {
        if !entry.file_name().to_string_lossy().contains(marker) {
            continue;
        }
        // Files can disappear between listing and stat
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata
            .modified()
            .with_context(|| format!("no mtime for {}", entry.path().display()))?;

        if latest.as_ref().is_none_or(|best| modified > best.modified) {
            latest = Some(Artifact {
                path: entry.path(),
                modified,
            });
        }
    }
    Ok(latest)
}
