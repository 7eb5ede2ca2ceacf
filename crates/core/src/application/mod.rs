// Application Layer - Table scanning, supervision and the watchdog loop

pub mod constants;
pub mod mount_table;
pub mod supervisor;
pub mod watchdog;

// Re-exports
pub use mount_table::{read_mount_table, scan_mount_table, MountTableReader, TableScan};
pub use supervisor::{
    EscalationOutcome, ProcessSupervisor, ShutdownSummary, StartOutcome, SupervisedProcess,
};
pub use watchdog::{
    MountMonitor, PollReport, WatchDog, WatchDogConfig, WatchDogHandle, WatchDogState,
};
