//! mountmond - Main Entry Point
//! Keeps configured mounts mounted by running their recovery commands

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use config::{expand_path, load_config, DEFAULT_CONFIG_PATH};
use logging::{init_logging, LogFormat};
use mountmond_core::application::WatchDog;
use mountmond_infra_system::{FileMountTable, ShellProcessLauncher};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "mountmond")]
#[command(about = "Watches the mount table and runs recovery commands for missing mounts", long_about = None)]
#[command(version)]
struct Args {
    /// Path to a YAML file containing configuration
    #[arg(long, env = "MOUNTMOND_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config_path: String,

    /// Log output format
    #[arg(long, env = "MOUNTMOND_LOG_FORMAT", value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long, env = "MOUNTMOND_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration (fatal before anything starts)
    let config_path = expand_path(&args.config_path)?;
    let config = load_config(&config_path)?;

    if args.check_config {
        println!(
            "{}: OK ({} mounts, poll every {:?}, mount table {})",
            config_path.display(),
            config.spec.len(),
            config.watchdog.poll_interval,
            config.mtab_path.display()
        );
        for (mount, command) in config.spec.iter() {
            println!("  {mount} -> {command}");
        }
        return Ok(());
    }

    // 2. Initialize logging
    let _log_guard = init_logging(args.log_format, args.log_dir.as_deref())?;
    info!("mountmond v{} starting...", VERSION);
    info!(config_path = %config_path.display(), watched_mounts = config.spec.len(), "Configuration loaded");

    // 3. Setup dependencies (DI wiring)
    let launcher = Arc::new(ShellProcessLauncher::new());
    let mount_table = Arc::new(FileMountTable::new(config.mtab_path));

    // 4. Start the watchdog
    let mut watchdog = WatchDog::new(config.spec, launcher, mount_table, config.watchdog)
        .start()
        .context("Failed to start watchdog")?;

    info!("Watching mounts. Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal
    wait_for_shutdown_signal().await?;
    info!("Shutdown signal received. Terminating recovery commands...");

    // 6. Graceful shutdown
    let summary = watchdog.shutdown().await?;
    for (mount, outcome) in &summary.outcomes {
        info!(mount = %mount, outcome = ?outcome, "Recovery command stopped");
    }

    info!("Shutdown complete.");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for SIGINT")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_flags() {
        let args = Args::try_parse_from([
            "mountmond",
            "--config-path",
            "/tmp/m.yaml",
            "--log-format",
            "json",
            "--check-config",
        ])
        .unwrap();

        assert_eq!(args.config_path, "/tmp/m.yaml");
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.check_config);
        assert!(args.log_dir.is_none());
    }
}
