//! Tracing subscriber setup.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Inputs that decide the log filter and outputs.
#[derive(Debug, Clone)]
pub(crate) struct LogSettings {
    verbose: u8,
    quiet: bool,
    level: String,
    debug: bool,
    file: Option<PathBuf>,
}

impl LogSettings {
    /// Settings from command-line flags alone.
    pub(crate) fn from_flags(verbose: u8, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            level: "warn".to_string(),
            debug: false,
            file: None,
        }
    }

    /// Applies the configuration file's logging section.
    pub(crate) fn with_config(mut self, level: &str, debug: bool, file: Option<&Path>) -> Self {
        self.level = level.to_string();
        self.debug = debug;
        self.file = file.map(Path::to_path_buf);
        self
    }

    /// Filter directive used when `RUST_LOG` is unset.
    fn directive(&self) -> &str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) if self.debug => "debug",
            (false, 0) => self.level.as_str(),
            (false, 1) => "debug",
            _ => "trace",
        }
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub(crate) fn init(settings: &LogSettings) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(settings.directive())
            .with_context(|| format!("Invalid log level: {}", settings.directive()))?,
    };

    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, guard) = match &settings.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Log file has no file name: {}", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
