// Shell process launcher
// reason: tokio for child process management, nix for SIGINT/SIGTERM delivery
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

use mountmond_core::application::constants::DEFAULT_SHELL;
use mountmond_core::port::{
    ProcessError, ProcessHandle, ProcessLauncher, ProcessStatus, TerminationSignal,
};

/// Runs recovery commands as `<shell> -c <command>`
///
/// The child inherits the daemon's environment, stdout and stderr; stdin is
/// closed. Must be used inside a tokio runtime.
pub struct ShellProcessLauncher {
    shell: String,
}

impl ShellProcessLauncher {
    /// Create a launcher using `sh`
    pub fn new() -> Self {
        Self::with_shell(DEFAULT_SHELL)
    }

    /// Create a launcher using another POSIX shell
    ///
    /// # Example
    /// ```ignore
    /// let launcher = ShellProcessLauncher::with_shell("/bin/bash");
    /// ```
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for ShellProcessLauncher {
    fn launch(&self, command: &str) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ProcessError::SpawnFailed(format!("{} -c {:?}: {}", self.shell, command, e)))?;

        let pid = child.id();
        debug!(shell = %self.shell, pid = ?pid, "Spawned shell");
        Ok(Box::new(ShellProcess { child, pid }))
    }
}

/// A shell started by `ShellProcessLauncher`
pub struct ShellProcess {
    child: Child,
    // Kept after reaping, when `Child::id` no longer reports it
    pid: Option<u32>,
}

impl ProcessHandle for ShellProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn poll_status(&mut self) -> Result<ProcessStatus, ProcessError> {
        match self.child.try_wait() {
            Ok(Some(status)) => Ok(ProcessStatus::Exited {
                code: status.code(),
                signal: exit_signal(&status),
            }),
            Ok(None) => Ok(ProcessStatus::Running),
            Err(e) => Err(ProcessError::StatusFailed(e.to_string())),
        }
    }

    fn signal(&mut self, signal: TerminationSignal) -> Result<(), ProcessError> {
        // None once the child has been reaped
        let pid = self.child.id().ok_or(ProcessError::NotRunning)?;

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let nix_signal = match signal {
                TerminationSignal::Interrupt => Signal::SIGINT,
                TerminationSignal::Terminate => Signal::SIGTERM,
                TerminationSignal::Kill => Signal::SIGKILL,
            };

            match kill(Pid::from_raw(pid as i32), nix_signal) {
                Ok(()) => {
                    debug!(pid = %pid, signal = %signal, "Signal sent");
                    Ok(())
                }
                Err(Errno::ESRCH) => Err(ProcessError::NotRunning),
                Err(e) => Err(ProcessError::SignalFailed {
                    signal,
                    reason: e.to_string(),
                }),
            }
        }

        #[cfg(not(unix))]
        {
            // No graceful signals here: every stage is a hard kill
            debug!(pid = %pid, signal = %signal, "Killing process");
            self.child
                .start_kill()
                .map_err(|e| ProcessError::SignalFailed {
                    signal,
                    reason: e.to_string(),
                })
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_for_exit(handle: &mut dyn ProcessHandle) -> ProcessStatus {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let status = handle.poll_status().unwrap();
                if status.has_exited() {
                    return status;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("process did not exit in time")
    }

    #[tokio::test]
    async fn test_launch_runs_shell_command_line() {
        let launcher = ShellProcessLauncher::new();

        let mut handle = launcher.launch("exit 3").unwrap();
        assert!(handle.pid().is_some());

        let status = wait_for_exit(handle.as_mut()).await;
        assert_eq!(
            status,
            ProcessStatus::Exited {
                code: Some(3),
                signal: None
            }
        );
        // pid survives reaping
        assert!(handle.pid().is_some());
    }

    #[tokio::test]
    async fn test_poll_does_not_block() {
        let launcher = ShellProcessLauncher::new();
        let mut handle = launcher.launch("sleep 30").unwrap();

        assert_eq!(handle.poll_status().unwrap(), ProcessStatus::Running);

        handle.signal(TerminationSignal::Kill).unwrap();
        let status = wait_for_exit(handle.as_mut()).await;
        assert_eq!(
            status,
            ProcessStatus::Exited {
                code: None,
                signal: Some(9)
            }
        );
    }

    #[tokio::test]
    async fn test_terminate_signal() {
        let launcher = ShellProcessLauncher::new();
        let mut handle = launcher.launch("sleep 30").unwrap();

        handle.signal(TerminationSignal::Terminate).unwrap();
        let status = wait_for_exit(handle.as_mut()).await;
        assert!(matches!(status, ProcessStatus::Exited { signal: Some(15), .. }));
    }

    #[tokio::test]
    async fn test_signal_after_reap_is_not_running() {
        let launcher = ShellProcessLauncher::new();
        let mut handle = launcher.launch("true").unwrap();
        wait_for_exit(handle.as_mut()).await;

        let result = handle.signal(TerminationSignal::Interrupt);
        assert!(matches!(result, Err(ProcessError::NotRunning)));
    }

    #[tokio::test]
    async fn test_missing_shell_fails_to_spawn() {
        let launcher = ShellProcessLauncher::with_shell("/nonexistent/mountmond-shell");

        let result = launcher.launch("true");
        assert!(matches!(result, Err(ProcessError::SpawnFailed(_))));
    }
}
