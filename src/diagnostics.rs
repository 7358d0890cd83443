//! Startup diagnostics: platform environment and workspace layout.
//!
//! Nothing here blocks startup. Missing variables and paths are logged as
//! warnings so a misconfigured deployment is obvious from the first lines
//! of the log.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::consts::{NAME, PLATFORM_ENV_PREFIX, REQUIRED_ENV_VARS, VERSION};

/// Snapshot of the platform-provided environment, secrets masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvReport {
    /// Each required variable and its (masked) value, if set.
    pub required: Vec<(String, Option<String>)>,
    /// Every variable with the platform prefix, masked, sorted by name.
    pub platform: BTreeMap<String, String>,
}

impl EnvReport {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let platform: BTreeMap<String, String> = vars
            .into_iter()
            .filter(|(name, _)| name.starts_with(PLATFORM_ENV_PREFIX))
            .map(|(name, value)| {
                let shown = display_value(&name, &value);
                (name, shown)
            })
            .collect();

        let required = REQUIRED_ENV_VARS
            .iter()
            .map(|name| (name.to_string(), platform.get(*name).cloned()))
            .collect();

        Self { required, platform }
    }

    pub fn missing(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// A pod id means we are running on the serverless platform.
    pub fn serverless(&self) -> bool {
        self.platform.contains_key("RUNPOD_POD_ID")
    }

    pub fn log(&self) {
        for (name, value) in &self.required {
            info!(var = %name, value = value.as_deref().unwrap_or("NOT SET"), "required env");
        }

        let missing = self.missing();
        if !missing.is_empty() {
            warn!(?missing, "missing environment variables, worker may not behave correctly");
        }

        info!(count = self.platform.len(), "platform environment variables");
        for (name, value) in &self.platform {
            info!(var = %name, value = %value, "platform env");
        }

        let serverless = self.serverless();
        info!(serverless, "serverless mode detection");
        if !serverless {
            warn!("RUNPOD_POD_ID not set, this may not be a serverless environment");
        }
    }
}

/// `abcdefgh...wxyz` for long values, `***` for short ones.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

fn is_sensitive(name: &str) -> bool {
    name.contains("KEY") || name.contains("SECRET")
}

fn display_value(name: &str, value: &str) -> String {
    if is_sensitive(name) {
        mask_secret(value)
    } else {
        value.to_string()
    }
}

/// Existence of one workspace path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCheck {
    pub path: PathBuf,
    pub exists: bool,
}

pub fn check_paths(paths: &[PathBuf]) -> Vec<PathCheck> {
    paths
        .iter()
        .map(|path| PathCheck {
            path: path.clone(),
            exists: path.exists(),
        })
        .collect()
}

/// Everything logged once before the worker starts taking jobs.
pub fn log_startup(config: &WorkerConfig) {
    info!(name = NAME, version = VERSION, "worker starting");
    info!(
        template = %config.workflow_template.display(),
        output_dir = %config.output_dir.display(),
        marker = %config.output_marker,
        timeout_secs = config.timeout_secs,
        cleanup = config.cleanup,
        "pipeline settings"
    );

    EnvReport::from_env().log();

    for check in check_paths(&config.workspace_paths()) {
        let status = if check.exists { "EXISTS" } else { "MISSING" };
        if check.exists {
            info!(path = %check.path.display(), status, "workspace path");
        } else {
            warn!(path = %check.path.display(), status, "workspace path");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn mask_long_secret() {
        assert_eq!(mask_secret("rpa_ABCDEFGHIJKLMNOP1234"), "rpa_ABCD...1234");
    }

    #[test]
    fn mask_short_secret() {
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("exactly12chr"), "***");
    }

    #[test]
    fn mask_thirteen_chars() {
        assert_eq!(mask_secret("abcdefghijklm"), "abcdefgh...jklm");
    }

    #[test]
    fn mask_multibyte_does_not_panic() {
        assert_eq!(mask_secret("ééééééééééééé"), "éééééééé...éééé");
    }

    #[test]
    fn report_masks_sensitive_names() {
        let report = EnvReport::from_vars(vars(&[
            ("RUNPOD_API_KEY", "rpa_ABCDEFGHIJKLMNOP1234"),
            ("RUNPOD_WEBHOOK_SECRET", "tiny"),
            ("RUNPOD_POD_ID", "pod-1"),
        ]));
        assert_eq!(report.platform["RUNPOD_API_KEY"], "rpa_ABCD...1234");
        assert_eq!(report.platform["RUNPOD_WEBHOOK_SECRET"], "***");
        assert_eq!(report.platform["RUNPOD_POD_ID"], "pod-1");
    }

    #[test]
    fn report_ignores_other_vars() {
        let report = EnvReport::from_vars(vars(&[("HOME", "/root"), ("PATH", "/bin")]));
        assert!(report.platform.is_empty());
        assert!(!report.serverless());
    }

    #[test]
    fn report_lists_missing_required() {
        let report = EnvReport::from_vars(vars(&[("RUNPOD_POD_ID", "pod-1")]));
        assert_eq!(report.missing(), vec!["RUNPOD_API_KEY", "RUNPOD_ENDPOINT_ID"]);
        assert!(report.serverless());
    }

    #[test]
    fn report_with_everything_set() {
        let report = EnvReport::from_vars(vars(&[
            ("RUNPOD_POD_ID", "pod-1"),
            ("RUNPOD_API_KEY", "k"),
            ("RUNPOD_ENDPOINT_ID", "ep"),
        ]));
        assert!(report.missing().is_empty());
        assert_eq!(report.required[1], ("RUNPOD_API_KEY".to_string(), Some("***".to_string())));
    }

    #[test]
    fn check_paths_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().to_path_buf();
        let absent = dir.path().join("missing");

        let checks = check_paths(&[present.clone(), absent.clone()]);
        assert_eq!(
            checks,
            vec![
                PathCheck {
                    path: present,
                    exists: true
                },
                PathCheck {
                    path: absent,
                    exists: false
                },
            ]
        );
    }

    #[test]
    fn log_startup_does_not_panic() {
        log_startup(&WorkerConfig::default());
    }
}
