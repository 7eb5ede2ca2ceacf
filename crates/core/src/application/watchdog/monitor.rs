// One poll tick: reap, scan, start commands for missing mounts
use tracing::{debug, error};

use crate::application::mount_table::scan_mount_table;
use crate::application::supervisor::{ProcessSupervisor, ShutdownSummary, StartOutcome};
use crate::domain::MissingMountSpec;
use crate::port::OpenMountTable;

/// What a single poll tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Mounts whose recovery command was found terminated
    pub reaped: Vec<String>,
    /// Configured mounts absent from the table
    pub missing: Vec<String>,
    /// Mounts for which a recovery command was started
    pub started: Vec<String>,
    pub spawn_failed: Vec<String>,
    /// Parsed entries in the snapshot
    pub entries_seen: usize,
    /// False if the snapshot could not be read completely (detection skipped)
    pub table_readable: bool,
}

/// Owns all polling state: the spec, the supervisor and the open mount table
pub struct MountMonitor {
    spec: MissingMountSpec,
    supervisor: ProcessSupervisor,
    table: Box<dyn OpenMountTable>,
}

impl MountMonitor {
    pub fn new(
        spec: MissingMountSpec,
        supervisor: ProcessSupervisor,
        table: Box<dyn OpenMountTable>,
    ) -> Self {
        Self {
            spec,
            supervisor,
            table,
        }
    }

    /// Run one tick
    ///
    /// Order:
    /// 1. Reap terminated recovery commands
    /// 2. Rewind and scan the mount table
    /// 3. Start the command of every configured mount that is neither present nor tracked
    pub fn poll_once(&mut self) -> PollReport {
        let mut report = PollReport {
            reaped: self.supervisor.reap_terminated(),
            ..Default::default()
        };

        // Without a complete table every unlisted mount would look missing
        let scan = match self.table.snapshot() {
            Ok(reader) => scan_mount_table(reader),
            Err(e) => {
                error!(error = %e, "Failed to read mount table, skipping missing mount detection");
                return report;
            }
        };
        report.entries_seen = scan.entries;
        if scan.truncated {
            error!(
                entries = scan.entries,
                "Mount table read was cut short, skipping missing mount detection"
            );
            return report;
        }
        report.table_readable = true;
        let present = scan.present;

        for (mount, command) in self.spec.iter() {
            if present.contains(mount) {
                continue;
            }
            report.missing.push(mount.to_string());

            match self.supervisor.start_if_absent(mount, command) {
                StartOutcome::Started => report.started.push(mount.to_string()),
                StartOutcome::SpawnFailed => report.spawn_failed.push(mount.to_string()),
                StartOutcome::AlreadyTracked => {
                    debug!(mount = %mount, "Mount still missing, recovery command already running");
                }
            }
        }

        report
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Terminate every tracked process, then close the mount table
    pub async fn shutdown(mut self) -> ShutdownSummary {
        let summary = self.supervisor.terminate_all().await;
        drop(self.table);
        debug!("Mount table closed");
        summary
    }
}
