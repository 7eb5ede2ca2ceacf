// Port Layer - Interfaces for OS-facing dependencies

pub mod mount_table;
pub mod process;

// Re-exports
pub use mount_table::{MountTableSource, OpenMountTable};
pub use process::{ProcessError, ProcessHandle, ProcessLauncher, ProcessStatus, TerminationSignal};
