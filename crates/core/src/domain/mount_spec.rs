// Missing Mount Spec: which mounts we watch and how to bring them back

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::error::{DomainError, Result};

/// One configured mount and its recovery command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountDescription {
    pub mount: String,
    pub command: String,
}

/// Immutable mount path -> shell command mapping
///
/// Iterates in mount path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingMountSpec {
    commands: BTreeMap<String, String>,
}

impl MissingMountSpec {
    /// Build the spec from configured descriptions
    ///
    /// A mount listed twice keeps its last command.
    ///
    /// # Errors
    /// - DomainError::InvalidMountSpec on an empty mount path or an empty command
    pub fn from_descriptions(descriptions: impl IntoIterator<Item = MountDescription>) -> Result<Self> {
        let mut commands = BTreeMap::new();
        for descr in descriptions {
            let mount = descr.mount.trim();
            if mount.is_empty() {
                return Err(DomainError::InvalidMountSpec(
                    "mount path must not be empty".to_string(),
                ));
            }
            if descr.command.trim().is_empty() {
                return Err(DomainError::InvalidMountSpec(format!(
                    "command for {} must not be empty",
                    mount
                )));
            }

            if let Some(previous) = commands.insert(mount.to_string(), descr.command) {
                warn!(mount = %mount, previous = %previous, "Mount listed more than once, keeping last command");
            }
        }
        Ok(Self { commands })
    }

    pub fn command_for(&self, mount: &str) -> Option<&str> {
        self.commands.get(mount).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.commands.iter().map(|(m, c)| (m.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<M: Into<String>, C: Into<String>> FromIterator<(M, C)> for MissingMountSpec {
    /// Test/embedding helper, skips validation
    fn from_iter<T: IntoIterator<Item = (M, C)>>(iter: T) -> Self {
        Self {
            commands: iter
                .into_iter()
                .map(|(m, c)| (m.into(), c.into()))
                .collect(),
        }
    }
}
