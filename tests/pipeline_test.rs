use std::path::Path;
use std::time::{Duration, Instant};

use kiln::artifact::find_latest;
use kiln::pipeline::comfy::ComfyCli;
use kiln::pipeline::{Pipeline, PipelineError};

#[tokio::test]
async fn clean_exit_is_success() {
    let dir = tempfile::tempdir().unwrap();
    let cli = ComfyCli::new("true", Duration::from_secs(10), dir.path().join("out"));

    cli.run(Path::new("w.json")).await.unwrap();
}

#[tokio::test]
async fn creates_output_dir_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("ComfyUI").join("output").join("Wan21");
    let cli = ComfyCli::new("true", Duration::from_secs(10), &out);

    cli.run(Path::new("w.json")).await.unwrap();

    assert!(out.is_dir());
}

#[tokio::test]
async fn non_zero_exit_is_failed_with_code() {
    let dir = tempfile::tempdir().unwrap();
    let cli = ComfyCli::new("exit 3", Duration::from_secs(10), dir.path());

    let err = cli.run(Path::new("w.json")).await.unwrap_err();

    assert!(matches!(err, PipelineError::Failed { code: Some(3) }));
}

#[tokio::test]
async fn deadline_kills_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let cli = ComfyCli::new("sleep 30", Duration::from_millis(200), dir.path());

    let started = Instant::now();
    let err = cli.run(Path::new("w.json")).await.unwrap_err();

    assert!(matches!(err, PipelineError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn workflow_path_reaches_the_command() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let workflow = dir.path().join("my workflow.json");
    std::fs::write(&workflow, br#"{"305": {}}"#).unwrap();

    let command = format!("cp {{workflow}} {}/copied-audio.mp4", out.display());
    let cli = ComfyCli::new(command, Duration::from_secs(10), &out);

    cli.run(&workflow).await.unwrap();

    assert_eq!(
        std::fs::read(out.join("copied-audio.mp4")).unwrap(),
        br#"{"305": {}}"#
    );
}

#[tokio::test]
async fn timeout_placeholder_is_substituted() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let command = format!("echo {{timeout}} > {}/timeout.txt", out.display());
    let cli = ComfyCli::new(command, Duration::from_secs(1800), &out);

    cli.run(Path::new("w.json")).await.unwrap();

    let written = std::fs::read_to_string(out.join("timeout.txt")).unwrap();
    assert_eq!(written.trim(), "1800");
}

#[tokio::test]
async fn deadline_kills_processes_the_shell_started() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    // The nested shell is not exec'd, so it outlives a kill aimed at `sh` alone
    let command = format!(
        "sh -c 'sleep 1; echo late > {}/late-audio.mp4'; true",
        out.display()
    );
    let cli = ComfyCli::new(command, Duration::from_millis(200), &out);

    let err = cli.run(Path::new("w.json")).await.unwrap_err();
    assert!(matches!(err, PipelineError::Timeout { .. }));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(find_latest(&out, "audio.mp4").await.unwrap().is_none());
}

#[tokio::test]
async fn dropped_run_kills_processes_the_shell_started() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let command = format!(
        "sh -c 'sleep 1; echo late > {}/late-audio.mp4'; true",
        out.display()
    );
    let cli = ComfyCli::new(command, Duration::from_secs(60), &out);

    let cancelled = tokio::time::timeout(Duration::from_millis(200), cli.run(Path::new("w.json"))).await;
    assert!(cancelled.is_err());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(find_latest(&out, "audio.mp4").await.unwrap().is_none());
}
