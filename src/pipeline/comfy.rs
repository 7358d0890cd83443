use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use super::{Pipeline, PipelineError};
use crate::config::WorkerConfig;

/// Runs a workflow through the `comfy` CLI (or any command line built from
/// the same template) under `sh -c`.
///
/// stdout/stderr are inherited so the tool's verbose log ends up in the
/// worker's log stream. The shell leads its own process group; on timeout,
/// or if the run is dropped mid-flight, the whole group is killed.
#[derive(Debug, Clone)]
pub struct ComfyCli {
    command: String,
    timeout: Duration,
    output_dir: PathBuf,
}

impl ComfyCli {
    /// `command` may reference `{workflow}` and `{timeout}`.
    pub fn new(command: impl Into<String>, timeout: Duration, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            timeout,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.command.clone(), config.timeout(), config.output_dir.clone())
    }

    /// The shell line that will be run for `workflow`.
    pub fn command_line(&self, workflow: &Path) -> String {
        self.command
            .replace("{workflow}", &shell_quote(&workflow.to_string_lossy()))
            .replace("{timeout}", &self.timeout.as_secs().to_string())
    }
}

#[async_trait]
impl Pipeline for ComfyCli {
    async fn run(&self, workflow: &Path) -> Result<(), PipelineError> {
        // The tool expects its output folder to be there already
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let line = self.command_line(workflow);
        info!(command = %line, timeout_secs = self.timeout.as_secs(), "starting pipeline");

        let started = Instant::now();
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&line)
            .stdin(Stdio::null())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()?;
        let mut group = GroupGuard::new(&child);

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => {
                group.disarm();
                let status = status?;
                let elapsed_secs = started.elapsed().as_secs();
                if status.success() {
                    info!(elapsed_secs, "pipeline finished");
                    Ok(())
                } else {
                    warn!(elapsed_secs, exit_code = ?status.code(), "pipeline failed");
                    Err(PipelineError::Failed {
                        code: status.code(),
                    })
                }
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "pipeline timed out, killing it");
                group.kill();
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to reap timed out pipeline");
                }
                Err(PipelineError::timeout(self.timeout))
            }
        }
    }
}

/// SIGKILLs the child's process group when dropped, unless disarmed.
/// Catches processes the shell started that `kill_on_drop` would miss.
struct GroupGuard {
    pgid: Option<Pid>,
}

impl GroupGuard {
    fn new(child: &Child) -> Self {
        let pgid = child
            .id()
            .and_then(|id| i32::try_from(id).ok())
            .map(Pid::from_raw);
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            match killpg(pgid, Signal::SIGKILL) {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => warn!(pgid = pgid.as_raw(), error = %e, "failed to kill pipeline process group"),
            }
        }
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Single-quote `s` for `sh` unless it is made only of safe characters.
fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.bytes().all(|b| {
            matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'/' | b':' | b'+' | b'=' | b',')
        });
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
