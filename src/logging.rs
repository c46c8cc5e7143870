//! Logging Module
//!
//! Daily rolling log file for diagnostics, with console output on stderr in
//! debug builds. If the log file cannot be opened, the console becomes the
//! only sink and the reason is logged there.

use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "mp-session";
const LOG_FILES_KEPT: usize = 7;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("cannot create log directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot open log file: {0}")]
    Appender(#[from] InitError),

    #[error("logging already initialised: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Filter used when `RUST_LOG` is unset: this crate at debug (info in
/// release), everything else quieter
fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,mp_session_lib=debug,mp_session=debug,hyper=warn,reqwest=warn"
    } else {
        "warn,mp_session_lib=info,mp_session=info"
    }
}

fn file_writer(log_dir: &Path) -> Result<RollingFileAppender, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::Directory {
        path: log_dir.to_path_buf(),
        source,
    })?;

    Ok(RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(LOG_FILES_KEPT)
        .build(log_dir)?)
}

/// Install the global subscriber.
///
/// A log file that cannot be opened is not fatal; it is reported through the
/// console layer once the subscriber is up. Only a failure to install the
/// subscriber itself is returned.
pub fn init(log_dir: &Path) -> Result<(), LoggingError> {
    let (file_layer, file_error) = match file_writer(log_dir) {
        Ok(appender) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(appender),
            ),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    // stderr keeps stdout clean for command output
    let console_layer = (cfg!(debug_assertions) || file_layer.is_none()).then(|| {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .pretty()
    });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter()));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(e) = file_error {
        warn!("File logging disabled, console only: {}", e);
    }

    Ok(())
}
