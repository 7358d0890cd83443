//! Periodic liveness logging while the worker waits on jobs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::consts::{HEARTBEAT_DELAY, HEARTBEAT_INTERVAL};

/// A background task that logs a heartbeat line on a fixed cadence.
///
/// Call [`Heartbeat::start`] once at process start and [`Heartbeat::stop`]
/// on shutdown. It touches nothing but the log.
pub struct Heartbeat {
    handle: JoinHandle<()>,
    cancel: watch::Sender<bool>,
    beats: Arc<AtomicU64>,
}

impl Heartbeat {
    /// First beat after 2s, then every 5s.
    pub fn start() -> Self {
        Self::with_timing(HEARTBEAT_DELAY, HEARTBEAT_INTERVAL)
    }

    pub fn with_timing(delay: Duration, interval: Duration) -> Self {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let beats = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&beats);

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel_rx.changed() => return,
            }
            loop {
                let beat = counter.fetch_add(1, Ordering::Relaxed) + 1;
                info!(
                    beat,
                    uptime_secs = started.elapsed().as_secs(),
                    "worker still running"
                );
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancel_rx.changed() => break,
                }
            }
        });

        info!(
            delay_secs = delay.as_secs(),
            interval_secs = interval.as_secs(),
            "heartbeat started"
        );
        Self {
            handle,
            cancel: cancel_tx,
            beats,
        }
    }

    /// Beats logged so far.
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    /// Stop the heartbeat and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        let _ = self.handle.await;
    }
}
