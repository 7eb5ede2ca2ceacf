// Domain Layer - Mount table entries and the mounts we watch

pub mod error;
pub mod mount_entry;
pub mod mount_spec;

// Re-exports
pub use error::{DomainError, ParseError};
pub use mount_entry::{parse_mount_line, parse_options, MountEntry, FLAG_OPTION_VALUE};
pub use mount_spec::{MissingMountSpec, MountDescription};
