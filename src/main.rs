use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use kiln::config::WorkerConfig;
use kiln::consts::{DEFAULT_EXIT_DELAY_SECS, TEST_INPUT_FILE};
use kiln::diagnostics::log_startup;
use kiln::handler::video::VideoHandler;
use kiln::heartbeat::Heartbeat;
use kiln::runtime::local::LocalSource;
use kiln::runtime::runpod::{RunpodConfig, RunpodSource};
use kiln::runtime::{JobSource, Worker};
use kiln::shutdown::Shutdown;

#[derive(Parser)]
#[command(name = "kiln", version, about = "Fires an image and an audio clip into a video.")]
struct Cli {
    #[command(flatten)]
    worker: WorkerConfig,

    #[command(flatten)]
    runpod: RunpodConfig,

    /// Run a single job from inline JSON (`{"input": {...}}`) and exit
    #[arg(long)]
    test_input: Option<String>,

    /// Seconds to wait before exiting after a fatal error, so logs get shipped
    #[arg(long, env = "KILN_EXIT_DELAY_SECS", default_value_t = DEFAULT_EXIT_DELAY_SECS)]
    exit_delay: u64,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let exit_delay = Duration::from_secs(cli.exit_delay);
    if let Err(e) = run(cli).await {
        error!(error = %format!("{e:#}"), "worker failed");
        info!(
            delay_secs = exit_delay.as_secs(),
            "waiting before exit so logs can be collected"
        );
        tokio::time::sleep(exit_delay).await;
        std::process::exit(1);
    }
    info!("worker stopped");
}

/// Colored text by default, JSON lines with `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kiln=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    log_startup(&cli.worker);

    let source = select_source(&cli).await?;
    let handler = Arc::new(VideoHandler::from_config(cli.worker));
    let worker = Worker::new(handler, source);

    let mut shutdown = Shutdown::install()?;
    let heartbeat = Heartbeat::start();

    // A stop signal ends the worker between or during jobs
    let outcome = tokio::select! {
        result = worker.run() => result.map(|served| info!(served, "job source exhausted")),
        signal = shutdown.recv() => {
            info!(signal, "stop signal received");
            Ok(())
        }
    };

    heartbeat.stop().await;
    outcome
}

/// Inline test input, then `test_input.json`, then the RunPod queue.
async fn select_source(cli: &Cli) -> Result<Arc<dyn JobSource>> {
    if let Some(json) = &cli.test_input {
        info!("running inline test input");
        return Ok(Arc::new(LocalSource::from_json(json)?));
    }

    let file = Path::new(TEST_INPUT_FILE);
    if file.exists() {
        info!(file = TEST_INPUT_FILE, "running local test input");
        return Ok(Arc::new(LocalSource::from_file(file).await?));
    }

    if cli.runpod.is_configured() {
        let source = RunpodSource::new(&cli.runpod)?;
        info!(url = source.job_url(), "serving jobs from the queue");
        return Ok(Arc::new(source));
    }

    bail!(
        "no job source: set RUNPOD_WEBHOOK_GET_JOB and RUNPOD_WEBHOOK_POST_OUTPUT, \
         pass --test-input, or provide {TEST_INPUT_FILE}"
    )
}
