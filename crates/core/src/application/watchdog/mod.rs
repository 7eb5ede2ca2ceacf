// WatchDog - periodic mount check loop

mod monitor;
mod stop;

pub use monitor::{MountMonitor, PollReport};
use stop::{stop_channel, StopListener, StopRequest};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::constants::{DEFAULT_ESCALATION_DELAY, DEFAULT_POLL_INTERVAL};
use crate::application::supervisor::{ProcessSupervisor, ShutdownSummary};
use crate::domain::MissingMountSpec;
use crate::error::{AppError, Result};
use crate::port::{MountTableSource, ProcessLauncher};

/// Watchdog timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchDogConfig {
    /// Time between two mount table checks
    pub poll_interval: Duration,
    /// Pause after each signal when terminating recovery commands
    pub escalation_delay: Duration,
}

impl Default for WatchDogConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            escalation_delay: DEFAULT_ESCALATION_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchDogState {
    Stopped,
    Running,
}

/// Keeps the configured mounts mounted
///
/// A `WatchDog` is always stopped; `start` consumes it and returns the
/// handle of the running instance. A stopped handle cannot be restarted,
/// build a new `WatchDog` instead.
///
/// A recovery command whose mount reappears while it is still running is not
/// killed. It stays tracked until it exits on its own or until shutdown.
pub struct WatchDog {
    spec: MissingMountSpec,
    launcher: Arc<dyn ProcessLauncher>,
    source: Arc<dyn MountTableSource>,
    config: WatchDogConfig,
}

impl WatchDog {
    /// Create a new (stopped) watchdog
    ///
    /// # Arguments
    /// * `spec` - Mounts to watch and their recovery commands
    /// * `launcher` - Starts recovery commands
    /// * `source` - Where the live mount table is read from
    /// * `config` - Poll interval and escalation delay
    pub fn new(
        spec: MissingMountSpec,
        launcher: Arc<dyn ProcessLauncher>,
        source: Arc<dyn MountTableSource>,
        config: WatchDogConfig,
    ) -> Self {
        Self {
            spec,
            launcher,
            source,
            config,
        }
    }

    /// Open the mount table and spawn the polling task
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// - AppError::Validation if the poll interval is zero
    /// - AppError::Io if the mount table cannot be opened
    pub fn start(self) -> Result<WatchDogHandle> {
        if self.config.poll_interval.is_zero() {
            return Err(AppError::Validation(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let location = self.source.describe();
        let table = self.source.open().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("cannot open mount table {}: {}", location, e),
            ))
        })?;

        info!(
            mount_table = %location,
            watched_mounts = self.spec.len(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "WatchDog started"
        );

        let supervisor = ProcessSupervisor::new(self.launcher, self.config.escalation_delay);
        let monitor = MountMonitor::new(self.spec, supervisor, table);
        let (stop, stop_listener) = stop_channel();
        let task = tokio::spawn(run_poll_loop(
            monitor,
            self.config.poll_interval,
            stop_listener,
        ));

        Ok(WatchDogHandle {
            stop,
            task: Some(task),
        })
    }
}

/// A running watchdog
///
/// Dropping the handle without calling `shutdown` stops the loop too, but then
/// nothing waits for the recovery commands to be terminated.
pub struct WatchDogHandle {
    stop: StopRequest,
    task: Option<JoinHandle<ShutdownSummary>>,
}

impl WatchDogHandle {
    pub fn state(&self) -> WatchDogState {
        match &self.task {
            Some(task) if !task.is_finished() => WatchDogState::Running,
            _ => WatchDogState::Stopped,
        }
    }

    /// Stop polling, terminate every recovery command and close the mount table
    ///
    /// Returns once the polling task has finished the kill pass.
    ///
    /// # Errors
    /// - AppError::InvalidState if the watchdog was already shut down
    /// - AppError::Internal if the polling task panicked
    pub async fn shutdown(&mut self) -> Result<ShutdownSummary> {
        let task = self
            .task
            .take()
            .ok_or_else(|| AppError::InvalidState("watchdog is not running".to_string()))?;

        info!("WatchDog shutting down");
        if !self.stop.send() {
            // Task already ended (panicked); the join below reports it
            warn!("Polling task is no longer listening");
        }

        let summary = task
            .await
            .map_err(|e| AppError::Internal(format!("polling task failed: {}", e)))?;

        info!(
            terminated = summary.terminated_count(),
            failed_tasks = summary.failed_tasks,
            "WatchDog stopped"
        );
        Ok(summary)
    }
}

async fn run_poll_loop(
    mut monitor: MountMonitor,
    poll_interval: Duration,
    mut stop: StopListener,
) -> ShutdownSummary {
    // First check one full interval after start
    let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // Shutdown wins over a due tick; a running tick is never interrupted
        tokio::select! {
            biased;
            _ = stop.requested() => {
                info!("Polling loop received shutdown");
                break;
            }
            _ = ticker.tick() => {
                let report = monitor.poll_once();
                if !report.spawn_failed.is_empty() {
                    warn!(mounts = ?report.spawn_failed, "Some recovery commands could not be started");
                }
                debug!(
                    entries = report.entries_seen,
                    reaped = report.reaped.len(),
                    missing = report.missing.len(),
                    started = report.started.len(),
                    tracked = monitor.supervisor().tracked_count(),
                    "Poll tick completed"
                );
            }
        }
    }

    drop(ticker);
    monitor.shutdown().await
}
