use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use clap::Args;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, warn};

use super::{Job, JobResult, JobSource};
use crate::consts::DEFAULT_POLL_INTERVAL_MS;

/// Worker id used when the platform does not provide one.
const FALLBACK_WORKER_ID: &str = "local-worker";

/// Connection settings for the RunPod serverless job queue.
#[derive(Debug, Clone, Default, Args)]
pub struct RunpodConfig {
    /// Job-take URL; `$ID` is replaced with the worker id
    #[arg(long, env = "RUNPOD_WEBHOOK_GET_JOB")]
    pub job_url: Option<String>,

    /// Result URL; `$ID` is replaced with the job id
    #[arg(long, env = "RUNPOD_WEBHOOK_POST_OUTPUT")]
    pub result_url: Option<String>,

    /// Queue API key, sent as the Authorization header
    #[arg(long, env = "RUNPOD_AI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Worker id reported to the queue
    #[arg(long, env = "RUNPOD_POD_ID")]
    pub worker_id: Option<String>,

    /// Wait between polls when the queue is empty, in milliseconds
    #[arg(long, env = "KILN_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
}

impl RunpodConfig {
    /// Whether both queue endpoints are known.
    pub fn is_configured(&self) -> bool {
        self.job_url.is_some() && self.result_url.is_some()
    }
}

/// Polls the RunPod job queue over HTTP and posts results back.
pub struct RunpodSource {
    client: reqwest::Client,
    job_url: String,
    result_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl RunpodSource {
    pub fn new(config: &RunpodConfig) -> Result<Self> {
        let worker_id = config.worker_id.as_deref().unwrap_or(FALLBACK_WORKER_ID);
        let job_url = config
            .job_url
            .as_deref()
            .ok_or_else(|| anyhow!("RUNPOD_WEBHOOK_GET_JOB is not set"))?
            .replace("$ID", worker_id);
        let result_url = config
            .result_url
            .as_deref()
            .ok_or_else(|| anyhow!("RUNPOD_WEBHOOK_POST_OUTPUT is not set"))?
            .replace("$RUNPOD_POD_ID", worker_id);

        Ok(Self {
            client: reqwest::Client::new(),
            job_url,
            result_url,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    pub fn job_url(&self) -> &str {
        &self.job_url
    }

    /// Result endpoint for one job, marked as not stale.
    pub fn result_url(&self, job_id: &str) -> String {
        let url = self.result_url.replace("$ID", job_id);
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}isStale=false")
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(AUTHORIZATION, key),
            None => request,
        }
    }

    /// A single poll. `Ok(None)` means the queue had nothing for us.
    pub async fn fetch(&self) -> Result<Option<Job>> {
        let resp = self
            .authorize(self.client.get(&self.job_url))
            .send()
            .await
            .context("job request failed")?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("job request returned {status}: {text}");
        }

        let body = resp.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let job: Job = serde_json::from_slice(&body).context("malformed job payload")?;
        Ok(Some(job))
    }
}

#[async_trait]
impl JobSource for RunpodSource {
    /// Blocks until a job arrives. Fetch failures are logged and polled
    /// through; the queue never runs dry.
    async fn next_job(&self) -> Result<Option<Job>> {
        loop {
            match self.fetch().await {
                Ok(Some(job)) => return Ok(Some(job)),
                Ok(None) => debug!("no job available"),
                Err(e) => warn!(error = %format!("{e:#}"), "job fetch failed"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn complete(&self, job: &Job, result: &JobResult) -> Result<()> {
        let url = self.result_url(&job.id);
        let resp = self
            .authorize(self.client.post(&url))
            .json(&result.to_body())
            .send()
            .await
            .context("result upload failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("result upload returned {status}: {text}");
        }
        Ok(())
    }
}
