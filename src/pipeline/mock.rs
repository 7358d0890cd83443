use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Pipeline, PipelineError};

/// A scripted pipeline for tests. Records every workflow it is given and
/// either writes a fixed artifact, writes nothing, or fails.
pub struct MockPipeline {
    artifact: Option<(PathBuf, Vec<u8>)>,
    exit_code: Option<i32>,
    runs: Mutex<Vec<PathBuf>>,
}

impl MockPipeline {
    /// Succeeds and writes `bytes` to `path`.
    pub fn producing(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            artifact: Some((path.into(), bytes.into())),
            exit_code: None,
            runs: Mutex::new(Vec::new()),
        }
    }

    /// Succeeds without writing anything.
    pub fn producing_nothing() -> Self {
        Self {
            artifact: None,
            exit_code: None,
            runs: Mutex::new(Vec::new()),
        }
    }

    /// Fails as if the tool exited with `code`.
    pub fn failing(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::producing_nothing()
        }
    }

    /// Workflows passed to `run`, in order.
    pub async fn runs(&self) -> Vec<PathBuf> {
        self.runs.lock().await.clone()
    }
}

#[async_trait]
impl Pipeline for MockPipeline {
    async fn run(&self, workflow: &Path) -> Result<(), PipelineError> {
        self.runs.lock().await.push(workflow.to_path_buf());

        if let Some(code) = self.exit_code {
            return Err(PipelineError::Failed { code: Some(code) });
        }
        if let Some((path, bytes)) = &self.artifact {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, bytes).await?;
        }
        Ok(())
    }
}
