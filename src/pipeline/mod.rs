pub mod comfy;
pub mod mock;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Why a pipeline run did not produce a clean exit.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to spawn pipeline: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("pipeline exited with {}", describe_code(.code))]
    Failed { code: Option<i32> },

    #[error("pipeline timed out after {secs} seconds")]
    Timeout { secs: u64 },
}

impl PipelineError {
    pub fn timeout(limit: Duration) -> Self {
        Self::Timeout {
            secs: limit.as_secs(),
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (killed by signal)".to_string(),
    }
}

/// Something that turns a patched workflow into an artifact on disk.
///
/// A run is atomic-or-timeout: it either finishes, fails, or is killed at
/// its deadline. There is no mid-flight cancellation.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn run(&self, workflow: &Path) -> Result<(), PipelineError>;
}
