//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Environment variable that overrides the log filter
pub const LOG_ENV_VAR: &str = "COMPOSTER_LOG";

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/composter/logs/`.
/// Log level is controlled by the `COMPOSTER_LOG` environment variable.
///
/// # Examples
/// ```bash
/// COMPOSTER_LOG=debug composter
/// COMPOSTER_LOG=composter_app=trace composter
/// ```
pub fn init() -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| Error::logging(format!("Failed to create {}: {}", log_dir.display(), e)))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "composter.log");

    // Default to info for our crates, allow override via COMPOSTER_LOG
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new("composter=info,composter_app=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .try_init()
        .map_err(|e| Error::logging(e.to_string()))?;

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("Composter starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("composter").join("logs"))
}
