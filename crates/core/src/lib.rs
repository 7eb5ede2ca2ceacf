// mountmond Core - Mount table parsing, process supervision, watchdog loop
// NO OS adapters here: processes and the mount table come in through ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};
