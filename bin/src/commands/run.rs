//! Run command implementation.

use crate::logging::{self, LogSettings};
use anyhow::{Context, Result};
use std::path::Path;
use tickscan_daemon::{Scanner, ScannerConfig};
use tracing::{error, info};

/// Load the configuration and scan until ctrl-c.
pub(crate) async fn run(config_path: &Path, log: LogSettings) -> Result<()> {
    let config = ScannerConfig::load(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    let log = log.with_config(
        &config.logging.level,
        config.debug,
        config.logging.file.as_deref(),
    );
    let _guard = logging::init(&log)?;

    let scanner = Scanner::connect(config, Some(config_path.to_path_buf()))
        .await
        .context("Failed to start scanner")?;

    let summary = scanner.run(shutdown_signal()).await;
    info!(cycles = summary.cycles, "scanner stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}
