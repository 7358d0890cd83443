//! Moving payload bytes between base64 and disk.

use std::path::Path;

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Decode `data` and write it to `path`, creating parent directories.
/// Overwrites any existing file.
///
/// Accepts a `data:<mime>;base64,` prefix and embedded ASCII whitespace.
pub async fn save_base64_to_file(data: &str, path: &Path) -> Result<()> {
    let bytes = decode(data).with_context(|| format!("invalid base64 for {}", path.display()))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Read a file fully and return it as standard base64.
pub async fn encode_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(STANDARD.encode(bytes))
}

fn decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = strip_data_uri(data);
    if payload.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(payload)
    }
}

/// `data:image/png;base64,AAAA` -> `AAAA`. Anything else passes through.
fn strip_data_uri(data: &str) -> &str {
    let trimmed = data.trim();
    if trimmed.starts_with("data:")
        && let Some((header, payload)) = trimmed.split_once(',')
        && header.ends_with(";base64")
    {
        return payload;
    }
    trimmed
}
