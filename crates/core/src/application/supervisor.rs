// Process supervisor: one recovery process per missing mount
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::port::{ProcessHandle, ProcessLauncher, ProcessStatus, TerminationSignal};

/// A running recovery command
///
/// The handle never leaves the supervisor.
pub struct SupervisedProcess {
    command: String,
    pid: Option<u32>,
    started_at: Instant,
    handle: Box<dyn ProcessHandle>,
}

impl SupervisedProcess {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// What `start_if_absent` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyTracked,
    SpawnFailed,
}

/// How a shutdown escalation ended for one mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// Exited after SIGINT
    Interrupted,
    /// Exited after SIGTERM
    Terminated,
    /// Reaped after SIGKILL
    Killed,
    /// Still not reaped after SIGKILL
    Unconfirmed,
}

/// Result of `terminate_all`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    pub outcomes: BTreeMap<String, EscalationOutcome>,
    /// Escalation tasks that panicked or were cancelled
    pub failed_tasks: usize,
}

impl ShutdownSummary {
    pub fn terminated_count(&self) -> usize {
        self.outcomes.len()
    }
}

/// Owns the mount path -> recovery process mapping
pub struct ProcessSupervisor {
    launcher: Arc<dyn ProcessLauncher>,
    processes: HashMap<String, SupervisedProcess>,
    escalation_delay: Duration,
}

impl ProcessSupervisor {
    /// Create a new supervisor
    ///
    /// # Arguments
    /// * `launcher` - Starts recovery commands
    /// * `escalation_delay` - Pause after each signal during `terminate_all`
    pub fn new(launcher: Arc<dyn ProcessLauncher>, escalation_delay: Duration) -> Self {
        Self {
            launcher,
            processes: HashMap::new(),
            escalation_delay,
        }
    }

    /// Start `command` for `mount` unless a process is already tracked for it
    ///
    /// A spawn failure is logged and leaves the mount untracked, so the next
    /// poll tries again.
    pub fn start_if_absent(&mut self, mount: &str, command: &str) -> StartOutcome {
        if self.processes.contains_key(mount) {
            return StartOutcome::AlreadyTracked;
        }

        info!(mount = %mount, command = %command, "Mount is missing, running its command");
        match self.launcher.launch(command) {
            Ok(handle) => {
                let pid = handle.pid();
                info!(mount = %mount, pid = ?pid, "Recovery command started");
                self.processes.insert(
                    mount.to_string(),
                    SupervisedProcess {
                        command: command.to_string(),
                        pid,
                        started_at: Instant::now(),
                        handle,
                    },
                );
                StartOutcome::Started
            }
            Err(e) => {
                error!(mount = %mount, command = %command, error = %e, "Failed to start recovery command");
                StartOutcome::SpawnFailed
            }
        }
    }

    /// Drop every tracked process that has exited. Never blocks.
    ///
    /// # Returns
    /// Mount paths whose process was removed
    pub fn reap_terminated(&mut self) -> Vec<String> {
        let mut reaped = Vec::new();

        for (mount, process) in self.processes.iter_mut() {
            match process.handle.poll_status() {
                Ok(ProcessStatus::Running) => {}
                Ok(ProcessStatus::Exited { code, signal }) => {
                    info!(
                        mount = %mount,
                        pid = ?process.pid,
                        exit_code = ?code,
                        signal = ?signal,
                        runtime_ms = process.started_at.elapsed().as_millis() as u64,
                        "Recovery command terminated"
                    );
                    reaped.push(mount.clone());
                }
                Err(e) => {
                    // Not waitable any more, so nothing left to supervise
                    warn!(mount = %mount, pid = ?process.pid, error = %e, "Status check failed, dropping recovery command");
                    reaped.push(mount.clone());
                }
            }
        }

        for mount in &reaped {
            self.processes.remove(mount);
        }
        reaped
    }

    /// Escalate SIGINT -> SIGTERM -> SIGKILL on every tracked process
    ///
    /// Escalations run concurrently, one task per mount; returns once all of
    /// them have finished. Nothing is tracked afterwards.
    pub async fn terminate_all(&mut self) -> ShutdownSummary {
        let mut summary = ShutdownSummary::default();
        if self.processes.is_empty() {
            return summary;
        }

        let delay = self.escalation_delay;
        let mut tasks = JoinSet::new();
        for (mount, process) in self.processes.drain() {
            tasks.spawn(escalate(mount, process, delay));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((mount, outcome)) => {
                    summary.outcomes.insert(mount, outcome);
                }
                Err(join_err) => {
                    if join_err.is_panic() {
                        error!("Escalation task panicked: {:?}", join_err);
                    } else {
                        error!("Escalation task cancelled: {:?}", join_err);
                    }
                    summary.failed_tasks += 1;
                }
            }
        }
        summary
    }

    pub fn is_tracked(&self, mount: &str) -> bool {
        self.processes.contains_key(mount)
    }

    pub fn tracked_count(&self) -> usize {
        self.processes.len()
    }

    /// Tracked mount paths, sorted
    pub fn tracked_mounts(&self) -> Vec<String> {
        let mut mounts: Vec<String> = self.processes.keys().cloned().collect();
        mounts.sort();
        mounts
    }

    pub fn get(&self, mount: &str) -> Option<&SupervisedProcess> {
        self.processes.get(mount)
    }
}

const ESCALATION: [(TerminationSignal, EscalationOutcome); 3] = [
    (TerminationSignal::Interrupt, EscalationOutcome::Interrupted),
    (TerminationSignal::Terminate, EscalationOutcome::Terminated),
    (TerminationSignal::Kill, EscalationOutcome::Killed),
];

async fn escalate(
    mount: String,
    mut process: SupervisedProcess,
    delay: Duration,
) -> (String, EscalationOutcome) {
    info!(mount = %mount, pid = ?process.pid, "Terminating recovery command");

    for (signal, outcome) in ESCALATION {
        if let Err(e) = process.handle.signal(signal) {
            // Already gone is exactly what we want
            debug!(mount = %mount, signal = %signal, error = %e, "Signal not delivered");
        }
        sleep(delay).await;

        if has_exited(&mount, process.handle.as_mut()) {
            info!(mount = %mount, signal = %signal, "Recovery command exited");
            return (mount, outcome);
        }
    }

    warn!(mount = %mount, pid = ?process.pid, "Recovery command not reaped after SIGKILL");
    (mount, EscalationOutcome::Unconfirmed)
}

fn has_exited(mount: &str, handle: &mut dyn ProcessHandle) -> bool {
    match handle.poll_status() {
        Ok(status) => status.has_exited(),
        Err(e) => {
            debug!(mount = %mount, error = %e, "Status check failed, treating process as gone");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::process::mocks::{MockBehavior, MockProcessLauncher};

    const DELAY: Duration = Duration::from_millis(1);

    fn supervisor(launcher: &Arc<MockProcessLauncher>) -> ProcessSupervisor {
        ProcessSupervisor::new(launcher.clone(), DELAY)
    }

    #[test]
    fn test_start_if_absent_twice_tracks_one() {
        let launcher = Arc::new(MockProcessLauncher::new_exit_on_interrupt());
        let mut sup = supervisor(&launcher);

        assert_eq!(sup.start_if_absent("/data", "mount /data"), StartOutcome::Started);
        assert_eq!(
            sup.start_if_absent("/data", "mount /data"),
            StartOutcome::AlreadyTracked
        );

        assert_eq!(sup.tracked_count(), 1);
        assert_eq!(launcher.launch_count(), 1);
        assert_eq!(sup.get("/data").unwrap().command(), "mount /data");
        assert!(sup.get("/data").unwrap().pid().is_some());
    }

    #[test]
    fn test_spawn_failure_leaves_mount_untracked() {
        let launcher = Arc::new(MockProcessLauncher::new_failing());
        let mut sup = supervisor(&launcher);

        assert_eq!(sup.start_if_absent("/data", "true"), StartOutcome::SpawnFailed);
        assert!(!sup.is_tracked("/data"));

        // Retried on the next attempt
        launcher.set_behavior(MockBehavior::ExitOn(TerminationSignal::Interrupt));
        assert_eq!(sup.start_if_absent("/data", "true"), StartOutcome::Started);
        assert!(sup.is_tracked("/data"));
    }

    #[test]
    fn test_reap_removes_exactly_exited() {
        let launcher = Arc::new(MockProcessLauncher::new_exit_on_interrupt());
        let mut sup = supervisor(&launcher);
        sup.start_if_absent("/a", "cmd-a");
        sup.start_if_absent("/b", "cmd-b");
        sup.start_if_absent("/c", "cmd-c");

        assert!(sup.reap_terminated().is_empty());

        launcher.launched_for("cmd-a")[0].exit(0);
        launcher.launched_for("cmd-c")[0].exit(1);

        let mut reaped = sup.reap_terminated();
        reaped.sort();
        assert_eq!(reaped, vec!["/a".to_string(), "/c".to_string()]);
        assert_eq!(sup.tracked_mounts(), vec!["/b".to_string()]);
    }

    #[test]
    fn test_reap_drops_process_with_broken_status() {
        let launcher = Arc::new(MockProcessLauncher::new_exit_on_interrupt());
        let mut sup = supervisor(&launcher);
        sup.start_if_absent("/data", "true");

        launcher.launched()[0].break_status();

        assert_eq!(sup.reap_terminated(), vec!["/data".to_string()]);
        assert_eq!(sup.tracked_count(), 0);
    }

    #[tokio::test]
    async fn test_terminate_all_stops_at_interrupt() {
        let launcher = Arc::new(MockProcessLauncher::new_exit_on_interrupt());
        let mut sup = supervisor(&launcher);
        sup.start_if_absent("/a", "cmd-a");
        sup.start_if_absent("/b", "cmd-b");

        let summary = sup.terminate_all().await;

        assert_eq!(sup.tracked_count(), 0);
        assert_eq!(summary.terminated_count(), 2);
        assert_eq!(summary.failed_tasks, 0);
        assert_eq!(summary.outcomes["/a"], EscalationOutcome::Interrupted);
        for process in launcher.launched() {
            assert_eq!(process.signals_received(), vec![TerminationSignal::Interrupt]);
            assert!(!process.is_alive());
        }
    }

    #[tokio::test]
    async fn test_terminate_all_escalates_per_process() {
        let launcher = Arc::new(MockProcessLauncher::new(MockBehavior::ExitOn(
            TerminationSignal::Terminate,
        )));
        let mut sup = supervisor(&launcher);
        sup.start_if_absent("/term", "stubborn");

        launcher.set_behavior(MockBehavior::ExitOn(TerminationSignal::Kill));
        sup.start_if_absent("/kill", "very-stubborn");

        launcher.set_behavior(MockBehavior::IgnoreSignals);
        sup.start_if_absent("/zombie", "unkillable");

        let summary = sup.terminate_all().await;

        assert_eq!(summary.outcomes["/term"], EscalationOutcome::Terminated);
        assert_eq!(summary.outcomes["/kill"], EscalationOutcome::Killed);
        assert_eq!(summary.outcomes["/zombie"], EscalationOutcome::Unconfirmed);
        assert_eq!(
            launcher.launched_for("unkillable")[0].signals_received(),
            vec![
                TerminationSignal::Interrupt,
                TerminationSignal::Terminate,
                TerminationSignal::Kill
            ]
        );
        assert_eq!(sup.tracked_count(), 0);
    }

    #[tokio::test]
    async fn test_terminate_all_handles_already_exited() {
        let launcher = Arc::new(MockProcessLauncher::new_ignoring_signals());
        let mut sup = supervisor(&launcher);
        sup.start_if_absent("/data", "true");
        launcher.launched()[0].exit(0);

        let summary = sup.terminate_all().await;

        // The SIGINT is refused but the process is still found gone
        assert_eq!(summary.outcomes["/data"], EscalationOutcome::Interrupted);
        assert!(launcher.launched()[0].signals_received().is_empty());
    }

    #[tokio::test]
    async fn test_terminate_all_empty() {
        let launcher = Arc::new(MockProcessLauncher::new_exit_on_interrupt());
        let mut sup = supervisor(&launcher);

        let summary = sup.terminate_all().await;
        assert_eq!(summary, ShutdownSummary::default());
    }
}
