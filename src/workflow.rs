//! ComfyUI workflow template patching.
//!
//! The template is an API-format workflow: a JSON object keyed by node id,
//! each node carrying an `inputs` object. Only the image loader and audio
//! loader inputs are rewritten; everything else is copied through untouched.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;

use crate::consts::{AUDIO_NODE, IMAGE_NODE};
use crate::id::RequestId;

/// A parsed, read-only workflow template.
#[derive(Debug, Clone)]
pub struct WorkflowTemplate {
    document: Value,
}

impl WorkflowTemplate {
    /// Read and parse the template at `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read workflow template {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("malformed workflow template {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)?;
        if !document.is_object() {
            bail!("workflow must be a JSON object keyed by node id");
        }
        Ok(Self { document })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// A copy of the template with the image and audio inputs pointed at
    /// the given paths.
    pub fn patch(&self, image: &Path, audio: &Path) -> Result<Value> {
        let mut patched = self.document.clone();
        set_input(&mut patched, IMAGE_NODE, "image", path_value(image))?;
        set_input(&mut patched, AUDIO_NODE, "audio", path_value(audio))?;
        Ok(patched)
    }

    /// Patch and persist as `<dir>/<id>.json`. Returns the written path.
    pub async fn write_patched(
        &self,
        dir: &Path,
        id: RequestId,
        image: &Path,
        audio: &Path,
    ) -> Result<PathBuf> {
        let patched = self.patch(image, audio)?;

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let path = patched_path(dir, id);
        let body = serde_json::to_vec(&patched)?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Where the patched copy for request `id` lives inside `dir`.
pub fn patched_path(dir: &Path, id: RequestId) -> PathBuf {
    dir.join(format!("{id}.json"))
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

fn set_input(document: &mut Value, node: &str, field: &str, value: Value) -> Result<()> {
    let inputs = document
        .get_mut(node)
        .ok_or_else(|| anyhow!("workflow has no node {node}"))?
        .get_mut("inputs")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| anyhow!("workflow node {node} has no inputs object"))?;
    inputs.insert(field.to_string(), value);
    Ok(())
}
