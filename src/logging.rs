//! File logging. The terminal belongs to the TUI, so nothing goes to stdout.

use color_eyre::{eyre::eyre, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding filter directives, e.g. `stackdeck=debug`
pub const LOG_ENV: &str = "STACKDECK_LOG";

const DEFAULT_FILTER: &str = "info";

/// `$XDG_DATA_HOME/stackdeck/stackdeck.log`, or the working directory when
/// no data dir is known
pub fn default_log_path() -> PathBuf {
  dirs::data_dir()
    .map(|dir| dir.join("stackdeck"))
    .unwrap_or_default()
    .join("stackdeck.log")
}

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(path: &Path) -> Result<WorkerGuard> {
  if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
    fs::create_dir_all(dir)
      .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
  }

  let file = fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .map_err(|e| eyre!("Failed to open log file {}: {}", path.display(), e))?;
  let (writer, guard) = tracing_appender::non_blocking(file);

  let filter =
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_log_path_file_name() {
    assert_eq!(
      default_log_path().file_name().and_then(|n| n.to_str()),
      Some("stackdeck.log")
    );
  }
}
