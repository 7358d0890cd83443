use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{Instrument, info, info_span, warn};

use super::{Handler, Response};
use crate::artifact::find_latest;
use crate::config::WorkerConfig;
use crate::consts::{ERR_MISSING_INPUT, ERR_VIDEO_NOT_FOUND, INPUT_AUDIO_NAME, INPUT_IMAGE_NAME};
use crate::id::RequestId;
use crate::media::{encode_file, save_base64_to_file};
use crate::pipeline::Pipeline;
use crate::pipeline::comfy::ComfyCli;
use crate::runtime::Job;
use crate::workflow::{WorkflowTemplate, patched_path};

/// Image + audio in, talking video out.
///
/// Every file a request writes is keyed by a fresh [`RequestId`]: inputs
/// under `<input_dir>/<id>/`, the descriptor at `<workflow_dir>/<id>.json`.
/// The output directory is shared with the pipeline, so the newest matching
/// artifact is taken; that is only sound while jobs run one at a time.
pub struct VideoHandler {
    config: WorkerConfig,
    pipeline: Arc<dyn Pipeline>,
}

impl VideoHandler {
    pub fn new(config: WorkerConfig, pipeline: Arc<dyn Pipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Handler backed by the `comfy` CLI as configured.
    pub fn from_config(config: WorkerConfig) -> Self {
        let pipeline = Arc::new(ComfyCli::from_config(&config));
        Self::new(config, pipeline)
    }

    /// Run one request through decode → patch → pipeline → resolve → encode.
    pub async fn process(&self, input: &Value) -> Result<Response> {
        let (Some(image), Some(audio)) = (payload(input, "image_base64"), payload(input, "audio_base64"))
        else {
            warn!("request is missing image or audio input");
            return Ok(Response::error(ERR_MISSING_INPUT));
        };

        let id = RequestId::new();
        let request_dir = self.config.input_dir.join(id.to_string());

        let result = self
            .generate(id, image, audio, &request_dir)
            .instrument(info_span!("request", request_id = %id))
            .await;

        if self.config.cleanup {
            remove_quietly(&request_dir, true).await;
            remove_quietly(&patched_path(&self.config.workflow_dir, id), false).await;
        }
        result
    }

    async fn generate(
        &self,
        id: RequestId,
        image: &str,
        audio: &str,
        request_dir: &Path,
    ) -> Result<Response> {
        let started = SystemTime::now();

        let image_path = request_dir.join(INPUT_IMAGE_NAME);
        let audio_path = request_dir.join(INPUT_AUDIO_NAME);
        save_base64_to_file(image, &image_path).await?;
        save_base64_to_file(audio, &audio_path).await?;
        info!(dir = %request_dir.display(), "inputs saved");

        let template = WorkflowTemplate::load(&self.config.workflow_template).await?;
        let workflow = template
            .write_patched(&self.config.workflow_dir, id, &image_path, &audio_path)
            .await?;
        info!(workflow = %workflow.display(), "workflow patched");

        self.pipeline.run(&workflow).await?;

        let Some(artifact) = find_latest(&self.config.output_dir, &self.config.output_marker).await?
        else {
            warn!(
                dir = %self.config.output_dir.display(),
                marker = %self.config.output_marker,
                "no artifact found after pipeline run"
            );
            return Ok(Response::error(ERR_VIDEO_NOT_FOUND));
        };

        if artifact.predates(started) {
            warn!(
                artifact = %artifact.path.display(),
                "newest artifact predates this request, it may be stale"
            );
        }
        info!(artifact = %artifact.path.display(), "selected artifact");

        let video = encode_file(&artifact.path).await?;
        info!(encoded_len = video.len(), "video encoded");

        if self.config.cleanup {
            remove_quietly(&artifact.path, false).await;
        }
        Ok(Response::video(video))
    }
}

#[async_trait]
impl Handler for VideoHandler {
    async fn handle(&self, job: &Job) -> Result<Value> {
        let response = self
            .process(&job.input)
            .instrument(info_span!("job", job_id = %job.id))
            .await?;
        Ok(serde_json::to_value(response)?)
    }
}

/// A non-empty string field, or `None`.
fn payload<'a>(input: &'a Value, field: &str) -> Option<&'a str> {
    input
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

async fn remove_quietly(path: &Path, dir: bool) {
    let result = if dir {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    if let Err(e) = result
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "cleanup failed");
    }
}
