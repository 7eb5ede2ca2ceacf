// mountmond Infrastructure - System Adapters
// Implements: ProcessLauncher, MountTableSource

pub mod mtab_file;
pub mod shell_launcher;

pub use mtab_file::FileMountTable;
pub use shell_launcher::{ShellProcess, ShellProcessLauncher};
