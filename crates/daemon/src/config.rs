//! Configuration file loading
//!
//! ```yaml
//! mounts:
//!   - mount: /data
//!     command: mount /data
//! poll_interval_secs: 15    # optional
//! escalation_delay_ms: 5    # optional
//! mtab_path: /etc/mtab      # optional
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mountmond_core::application::constants::{
    DEFAULT_ESCALATION_DELAY, DEFAULT_MTAB_PATH, DEFAULT_POLL_INTERVAL,
};
use mountmond_core::application::WatchDogConfig;
use mountmond_core::domain::{MissingMountSpec, MountDescription};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mountmond.yaml";

/// Raw configuration document
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub mounts: Vec<MountDescription>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_escalation_delay_ms")]
    pub escalation_delay_ms: u64,
    #[serde(default = "default_mtab_path")]
    pub mtab_path: String,
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_escalation_delay_ms() -> u64 {
    DEFAULT_ESCALATION_DELAY.as_millis() as u64
}

fn default_mtab_path() -> String {
    DEFAULT_MTAB_PATH.to_string()
}

/// Validated configuration, ready for wiring
#[derive(Debug)]
pub struct DaemonConfig {
    pub spec: MissingMountSpec,
    pub watchdog: WatchDogConfig,
    pub mtab_path: PathBuf,
}

/// Expand `~` and `$VARS` in a user supplied path
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded =
        shellexpand::full(raw).with_context(|| format!("Failed to expand path {raw}"))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

pub fn load_config(path: &Path) -> Result<DaemonConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config in {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<DaemonConfig> {
    let file: ConfigFile = serde_yaml::from_str(content).context("Failed to parse YAML config")?;

    if file.poll_interval_secs == 0 {
        bail!("poll_interval_secs must be greater than zero");
    }

    let spec = MissingMountSpec::from_descriptions(file.mounts)?;
    let mtab_path = expand_path(&file.mtab_path)?;

    Ok(DaemonConfig {
        spec,
        watchdog: WatchDogConfig {
            poll_interval: Duration::from_secs(file.poll_interval_secs),
            escalation_delay: Duration::from_millis(file.escalation_delay_ms),
        },
        mtab_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_config(
            "mounts:\n  - mount: /data\n    command: mount /data\n  - mount: /backup\n    command: systemctl restart backup.mount\n",
        )
        .unwrap();

        assert_eq!(config.spec.len(), 2);
        assert_eq!(config.spec.command_for("/data"), Some("mount /data"));
        assert_eq!(config.watchdog, WatchDogConfig::default());
        assert_eq!(config.mtab_path, PathBuf::from(DEFAULT_MTAB_PATH));
    }

    #[test]
    fn test_parse_overrides() {
        let config = parse_config(
            "mounts: []\npoll_interval_secs: 60\nescalation_delay_ms: 250\nmtab_path: /proc/self/mounts\n",
        )
        .unwrap();

        assert!(config.spec.is_empty());
        assert_eq!(config.watchdog.poll_interval, Duration::from_secs(60));
        assert_eq!(config.watchdog.escalation_delay, Duration::from_millis(250));
        assert_eq!(config.mtab_path, PathBuf::from("/proc/self/mounts"));
    }

    #[test]
    fn test_missing_mounts_key_is_rejected() {
        assert!(parse_config("poll_interval_secs: 5\n").is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(parse_config("mounts: []\nintervall: 5\n").is_err());
        assert!(parse_config("mounts:\n  - mount: /a\n    command: x\n    user: root\n").is_err());
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let err = parse_config("mounts:\n  - mount: /data\n    command: \"\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("must not be empty"));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        assert!(parse_config("mounts: []\npoll_interval_secs: 0\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/mountmond.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
