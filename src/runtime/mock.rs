use std::collections::VecDeque;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Job, JobResult, JobSource};

/// A scripted source for tests. Hands out jobs in order and records every
/// reported result.
pub struct MockSource {
    jobs: Mutex<VecDeque<Job>>,
    results: Mutex<Vec<(String, JobResult)>>,
    fail_reports: bool,
}

impl MockSource {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs: Mutex::new(jobs.into()),
            results: Mutex::new(Vec::new()),
            fail_reports: false,
        }
    }

    /// Like [`MockSource::new`], but every `complete` call fails after
    /// recording its result.
    pub fn failing_reports(jobs: Vec<Job>) -> Self {
        Self {
            fail_reports: true,
            ..Self::new(jobs)
        }
    }

    /// `(job id, result)` pairs in the order they were reported.
    pub async fn results(&self) -> Vec<(String, JobResult)> {
        self.results.lock().await.clone()
    }
}

#[async_trait]
impl JobSource for MockSource {
    async fn next_job(&self) -> Result<Option<Job>> {
        Ok(self.jobs.lock().await.pop_front())
    }

    async fn complete(&self, job: &Job, result: &JobResult) -> Result<()> {
        self.results
            .lock()
            .await
            .push((job.id.clone(), result.clone()));
        if self.fail_reports {
            bail!("MockSource: report rejected for {}", job.id);
        }
        Ok(())
    }
}
