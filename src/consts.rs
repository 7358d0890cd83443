//! Project-wide constants.

use std::time::Duration;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Root of the worker's filesystem layout.
pub const DEFAULT_WORKSPACE: &str = "/workspace";

/// Read-only workflow template. Every request patches a copy of it.
pub const DEFAULT_WORKFLOW_TEMPLATE: &str = "/workspace/workflow/workflow.json";

/// Decoded request payloads land under `<input_dir>/<request-id>/`.
pub const DEFAULT_INPUT_DIR: &str = "/workspace/input";

/// Patched workflow copies, one `<request-id>.json` per request.
pub const DEFAULT_WORKFLOW_DIR: &str = "/workspace/ComfyUI/Json";

/// Where ComfyUI writes finished videos.
pub const DEFAULT_OUTPUT_DIR: &str = "/workspace/ComfyUI/output/Wan21";

/// Only files whose name contains this are considered artifacts.
pub const DEFAULT_OUTPUT_MARKER: &str = "audio.mp4";

/// Command line template. `{workflow}` and `{timeout}` are substituted.
pub const DEFAULT_COMMAND: &str =
    "comfy run --workflow {workflow} --wait --timeout {timeout} --verbose";

/// Upper bound on a single pipeline run (30 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 1800;

/// Template node holding the image path.
pub const IMAGE_NODE: &str = "305";
/// Template node holding the audio path.
pub const AUDIO_NODE: &str = "306";

pub const INPUT_IMAGE_NAME: &str = "input_image.png";
pub const INPUT_AUDIO_NAME: &str = "input_audio.wav";

pub const ERR_MISSING_INPUT: &str = "missing image or audio input";
pub const ERR_VIDEO_NOT_FOUND: &str = "video not found or generation failed";

/// Delay before the first heartbeat line.
pub const HEARTBEAT_DELAY: Duration = Duration::from_secs(2);
/// Interval between heartbeat lines.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// How long a failed process lingers before exiting so logs get shipped.
pub const DEFAULT_EXIT_DELAY_SECS: u64 = 30;

/// Idle wait between queue polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Local test-mode input file, picked up from the working directory.
pub const TEST_INPUT_FILE: &str = "test_input.json";

/// Variables the worker expects from the serverless platform.
pub const REQUIRED_ENV_VARS: &[&str] = &["RUNPOD_POD_ID", "RUNPOD_API_KEY", "RUNPOD_ENDPOINT_ID"];

/// Prefix of all platform-provided variables.
pub const PLATFORM_ENV_PREFIX: &str = "RUNPOD";
