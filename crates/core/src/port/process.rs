// Process Port
// Abstraction for launching recovery commands and poking at the resulting processes

use std::fmt;
use thiserror::Error;

/// Signals used by the shutdown escalation, mildest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
    Kill,
}

impl TerminationSignal {
    /// POSIX signal number
    pub fn as_raw(self) -> i32 {
        match self {
            TerminationSignal::Interrupt => 2,
            TerminationSignal::Terminate => 15,
            TerminationSignal::Kill => 9,
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
            TerminationSignal::Kill => write!(f, "SIGKILL"),
        }
    }
}

/// Result of a non-blocking status check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
}

impl ProcessStatus {
    pub fn has_exited(&self) -> bool {
        matches!(self, ProcessStatus::Exited { .. })
    }
}

/// Process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Process is not running")]
    NotRunning,

    #[error("Sending {signal} failed: {reason}")]
    SignalFailed {
        signal: TerminationSignal,
        reason: String,
    },

    #[error("Status check failed: {0}")]
    StatusFailed(String),
}

/// Starts recovery commands
///
/// Implementations:
/// - ShellProcessLauncher (infra-system): `sh -c <command>`
/// - mocks::MockProcessLauncher: in-memory fake for tests
pub trait ProcessLauncher: Send + Sync {
    /// Start `command` as a full shell command line
    ///
    /// # Errors
    /// - ProcessError::SpawnFailed if the process cannot be started
    fn launch(&self, command: &str) -> Result<Box<dyn ProcessHandle>, ProcessError>;
}

/// Handle to one launched process, owned exclusively by its supervisor
pub trait ProcessHandle: Send {
    /// OS process id, if known
    fn pid(&self) -> Option<u32>;

    /// Check whether the process has exited, reaping it if so. Never blocks.
    fn poll_status(&mut self) -> Result<ProcessStatus, ProcessError>;

    /// Deliver a termination signal
    ///
    /// # Errors
    /// - ProcessError::NotRunning if the process is already gone
    /// - ProcessError::SignalFailed if delivery failed for another reason
    fn signal(&mut self, signal: TerminationSignal) -> Result<(), ProcessError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Mock process behavior
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockBehavior {
        /// Exit once a signal at least this strong arrives
        ExitOn(TerminationSignal),
        /// Never exit on a signal (not even SIGKILL)
        IgnoreSignals,
        /// Every launch fails
        FailSpawn,
    }

    #[derive(Debug)]
    struct MockProcessState {
        status: ProcessStatus,
        signals: Vec<TerminationSignal>,
        status_broken: bool,
    }

    /// Test-side view of a launched mock process
    #[derive(Clone)]
    pub struct MockProcess {
        command: String,
        pid: u32,
        behavior: MockBehavior,
        state: Arc<Mutex<MockProcessState>>,
    }

    impl MockProcess {
        pub fn command(&self) -> &str {
            &self.command
        }

        pub fn pid(&self) -> u32 {
            self.pid
        }

        /// Simulate the process exiting on its own
        pub fn exit(&self, code: i32) {
            self.state.lock().unwrap().status = ProcessStatus::Exited {
                code: Some(code),
                signal: None,
            };
        }

        /// Make every further status check fail
        pub fn break_status(&self) {
            self.state.lock().unwrap().status_broken = true;
        }

        pub fn is_alive(&self) -> bool {
            !self.state.lock().unwrap().status.has_exited()
        }

        pub fn signals_received(&self) -> Vec<TerminationSignal> {
            self.state.lock().unwrap().signals.clone()
        }
    }

    struct MockProcessHandle {
        process: MockProcess,
    }

    impl ProcessHandle for MockProcessHandle {
        fn pid(&self) -> Option<u32> {
            Some(self.process.pid)
        }

        fn poll_status(&mut self) -> Result<ProcessStatus, ProcessError> {
            let state = self.process.state.lock().unwrap();
            if state.status_broken {
                return Err(ProcessError::StatusFailed("mock status failure".to_string()));
            }
            Ok(state.status)
        }

        fn signal(&mut self, signal: TerminationSignal) -> Result<(), ProcessError> {
            let mut state = self.process.state.lock().unwrap();
            if state.status.has_exited() {
                return Err(ProcessError::NotRunning);
            }
            state.signals.push(signal);

            if let MockBehavior::ExitOn(threshold) = self.process.behavior {
                if signal >= threshold {
                    state.status = ProcessStatus::Exited {
                        code: None,
                        signal: Some(signal.as_raw()),
                    };
                }
            }
            Ok(())
        }
    }

    /// Mock ProcessLauncher for testing
    pub struct MockProcessLauncher {
        behavior: Mutex<MockBehavior>,
        launched: Mutex<Vec<MockProcess>>,
        next_pid: AtomicU32,
    }

    impl MockProcessLauncher {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Mutex::new(behavior),
                launched: Mutex::new(Vec::new()),
                next_pid: AtomicU32::new(1000),
            }
        }

        pub fn new_exit_on_interrupt() -> Self {
            Self::new(MockBehavior::ExitOn(TerminationSignal::Interrupt))
        }

        pub fn new_ignoring_signals() -> Self {
            Self::new(MockBehavior::IgnoreSignals)
        }

        pub fn new_failing() -> Self {
            Self::new(MockBehavior::FailSpawn)
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        /// Every process launched so far, in launch order
        pub fn launched(&self) -> Vec<MockProcess> {
            self.launched.lock().unwrap().clone()
        }

        pub fn launch_count(&self) -> usize {
            self.launched.lock().unwrap().len()
        }

        /// Processes launched for one command
        pub fn launched_for(&self, command: &str) -> Vec<MockProcess> {
            self.launched
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.command == command)
                .cloned()
                .collect()
        }
    }

    impl ProcessLauncher for MockProcessLauncher {
        fn launch(&self, command: &str) -> Result<Box<dyn ProcessHandle>, ProcessError> {
            let behavior = *self.behavior.lock().unwrap();
            if behavior == MockBehavior::FailSpawn {
                return Err(ProcessError::SpawnFailed(format!(
                    "mock refused to launch {:?}",
                    command
                )));
            }

            let process = MockProcess {
                command: command.to_string(),
                pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
                behavior,
                state: Arc::new(Mutex::new(MockProcessState {
                    status: ProcessStatus::Running,
                    signals: Vec::new(),
                    status_broken: false,
                })),
            };
            self.launched.lock().unwrap().push(process.clone());

            Ok(Box::new(MockProcessHandle { process }))
        }
    }
}
