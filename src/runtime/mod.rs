//! Job dispatch: pull a job, hand it to the handler, report the result.
//!
//! Sources are pluggable behind [`JobSource`]: the RunPod queue in
//! production, a one-shot local input for smoke tests, and a scripted mock.

pub mod local;
pub mod mock;
pub mod runpod;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::handler::Handler;

/// One unit of work as delivered by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub input: Value,
}

/// What gets reported back for a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    Output(Value),
    Error(String),
}

impl JobResult {
    /// Handler outcome → reportable result. A response body carrying an
    /// `"error"` key counts as a failed job, as does an unhandled error.
    pub fn from_handler(result: Result<Value>) -> Self {
        match result {
            Ok(value) => match value.get("error") {
                Some(Value::String(message)) => Self::Error(message.clone()),
                Some(other) => Self::Error(other.to_string()),
                None => Self::Output(value),
            },
            Err(e) => Self::Error(format!("{e:#}")),
        }
    }

    /// Wire shape: `{"output": ...}` or `{"error": "..."}`.
    pub fn to_body(&self) -> Value {
        match self {
            Self::Output(value) => json!({ "output": value }),
            Self::Error(message) => json!({ "error": message }),
        }
    }
}

/// Where jobs come from and where results go.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// The next job, or `None` once the source is exhausted.
    async fn next_job(&self) -> Result<Option<Job>>;

    async fn complete(&self, job: &Job, result: &JobResult) -> Result<()>;
}

/// Serves jobs from a source, strictly one at a time.
pub struct Worker {
    handler: Arc<dyn Handler>,
    source: Arc<dyn JobSource>,
}

impl Worker {
    pub fn new(handler: Arc<dyn Handler>, source: Arc<dyn JobSource>) -> Self {
        Self { handler, source }
    }

    /// Run until the source is exhausted. Returns the number of jobs served.
    pub async fn run(&self) -> Result<usize> {
        let mut served = 0;
        while let Some(job) = self.source.next_job().await? {
            info!(job_id = %job.id, "job received");
            let started = Instant::now();

            let result = JobResult::from_handler(self.handler.handle(&job).await);
            let elapsed_secs = started.elapsed().as_secs();
            match &result {
                JobResult::Output(_) => info!(job_id = %job.id, elapsed_secs, "job completed"),
                JobResult::Error(message) => {
                    warn!(job_id = %job.id, elapsed_secs, error = %message, "job failed")
                }
            }

            if let Err(e) = self.source.complete(&job, &result).await {
                error!(job_id = %job.id, error = %format!("{e:#}"), "failed to report job result");
            }
            served += 1;
        }
        Ok(served)
    }
}
