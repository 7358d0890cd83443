use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Job, JobResult, JobSource};

/// Job id given to local inputs that do not carry one.
pub const LOCAL_JOB_ID: &str = "local_test";

/// A single job from `--test-input` or `test_input.json`. The result is
/// printed to stdout as JSON, then the source is exhausted.
pub struct LocalSource {
    job: Mutex<Option<Job>>,
}

impl LocalSource {
    /// Parse `{"input": {...}}` (an `id` is optional).
    pub fn from_json(text: &str) -> Result<Self> {
        let mut job: Job = serde_json::from_str(text).context("test input is not a valid job")?;
        if job.id.is_empty() {
            job.id = LOCAL_JOB_ID.to_string();
        }
        Ok(Self {
            job: Mutex::new(Some(job)),
        })
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&text)
    }
}

#[async_trait]
impl JobSource for LocalSource {
    async fn next_job(&self) -> Result<Option<Job>> {
        Ok(self.job.lock().await.take())
    }

    async fn complete(&self, _job: &Job, result: &JobResult) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(&result.to_body())?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn yields_one_job_then_exhausts() {
        let source = LocalSource::from_json(r#"{"input": {"image_base64": "aa"}}"#).unwrap();

        let job = source.next_job().await.unwrap().unwrap();
        assert_eq!(job.id, LOCAL_JOB_ID);
        assert_eq!(job.input, json!({"image_base64": "aa"}));

        assert!(source.next_job().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keeps_explicit_id() {
        let source = LocalSource::from_json(r#"{"id": "abc", "input": {}}"#).unwrap();
        assert_eq!(source.next_job().await.unwrap().unwrap().id, "abc");
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(LocalSource::from_json("{input:").is_err());
    }

    #[tokio::test]
    async fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_input.json");
        std::fs::write(&path, r#"{"input": {"audio_base64": "bb"}}"#).unwrap();

        let source = LocalSource::from_file(&path).await.unwrap();
        let job = source.next_job().await.unwrap().unwrap();
        assert_eq!(job.input["audio_base64"], "bb");
    }

    #[tokio::test]
    async fn missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            LocalSource::from_file(&dir.path().join("nope.json"))
                .await
                .is_err()
        );
    }
}
