pub mod video;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runtime::Job;

/// The outermost boundary. The runtime only knows this trait.
///
/// `Ok` carries the response body, including handled failures shaped as
/// `{"error": ...}`. `Err` is an unhandled failure; the runtime decides how
/// to report it.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<Value>;
}

/// Response body of the video handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Video { video_base64: String },
    Error { error: String },
}

impl Response {
    pub fn video(video_base64: impl Into<String>) -> Self {
        Self::Video {
            video_base64: video_base64.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
