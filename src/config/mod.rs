//! Worker configuration.
//!
//! Every field is settable by flag or environment variable. The defaults
//! match the stock ComfyUI serverless image layout under `/workspace`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::consts::{
    DEFAULT_COMMAND, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_MARKER,
    DEFAULT_TIMEOUT_SECS, DEFAULT_WORKFLOW_DIR, DEFAULT_WORKFLOW_TEMPLATE, DEFAULT_WORKSPACE,
};

/// Filesystem layout and pipeline settings for the video handler.
#[derive(Debug, Clone, Args)]
pub struct WorkerConfig {
    /// Workspace root (only used for startup diagnostics)
    #[arg(long, env = "KILN_WORKSPACE", default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,

    /// Workflow template patched for every request
    #[arg(long, env = "KILN_WORKFLOW_TEMPLATE", default_value = DEFAULT_WORKFLOW_TEMPLATE)]
    pub workflow_template: PathBuf,

    /// Directory for decoded request inputs
    #[arg(long, env = "KILN_INPUT_DIR", default_value = DEFAULT_INPUT_DIR)]
    pub input_dir: PathBuf,

    /// Directory for patched workflow copies
    #[arg(long, env = "KILN_WORKFLOW_DIR", default_value = DEFAULT_WORKFLOW_DIR)]
    pub workflow_dir: PathBuf,

    /// Directory scanned for generated videos
    #[arg(long, env = "KILN_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Substring an output file name must contain to be picked up
    #[arg(long, env = "KILN_OUTPUT_MARKER", default_value = DEFAULT_OUTPUT_MARKER)]
    pub output_marker: String,

    /// Pipeline command line; {workflow} and {timeout} are substituted
    #[arg(long, env = "KILN_COMMAND", default_value = DEFAULT_COMMAND)]
    pub command: String,

    /// Pipeline timeout in seconds
    #[arg(short, long = "timeout", env = "KILN_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Remove per-request inputs, descriptor and returned video after each job
    #[arg(long, env = "KILN_CLEANUP", default_value_t = false)]
    pub cleanup: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            workflow_template: PathBuf::from(DEFAULT_WORKFLOW_TEMPLATE),
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            workflow_dir: PathBuf::from(DEFAULT_WORKFLOW_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_marker: DEFAULT_OUTPUT_MARKER.to_string(),
            command: DEFAULT_COMMAND.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cleanup: false,
        }
    }
}

impl WorkerConfig {
    /// Config rooted at an arbitrary directory, same relative layout as the
    /// defaults. Handy for tests and local runs.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            workflow_template: root.join("workflow").join("workflow.json"),
            input_dir: root.join("input"),
            workflow_dir: root.join("ComfyUI").join("Json"),
            output_dir: root.join("ComfyUI").join("output").join("Wan21"),
            workspace: root,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Paths reported by the startup diagnostics.
    pub fn workspace_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.workspace.clone()];
        if let Some(comfy) = self.workflow_dir.parent() {
            paths.push(comfy.to_path_buf());
        }
        if let Some(templates) = self.workflow_template.parent() {
            paths.push(templates.to_path_buf());
        }
        paths.push(self.input_dir.clone());
        paths
    }
}
