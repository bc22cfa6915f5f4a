//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Create the log directory and open the dated log file
//! - Configure log level from the environment
//!
//! # Design Decisions
//! - Console output keeps working when the log file cannot be opened
//! - File output has ANSI colours disabled

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Local, TimeZone};
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "tcp_server=info";

#[derive(Debug, Error)]
pub enum LogSetupError {
    #[error("permission denied for log directory {0}")]
    PermissionDenied(PathBuf),
    #[error("failed to create log directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open log file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where log files go: `<path>/<name>-<date>.<ext>`.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub path: PathBuf,
    pub name: String,
    pub ext: String,
    /// `chrono` format string for the date part of the file name.
    pub time_format: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs"),
            name: "tcp-server".to_string(),
            ext: "log".to_string(),
            time_format: "%Y-%m-%d".to_string(),
        }
    }
}

impl LogSettings {
    /// File name for a log opened at `now`.
    pub fn file_name<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!("{}-{}.{}", self.name, now.format(&self.time_format), self.ext)
    }

    /// Create the directory if needed and open today's file for appending.
    pub fn open(&self) -> Result<(PathBuf, File), LogSetupError> {
        fs::create_dir_all(&self.path).map_err(|source| match source.kind() {
            ErrorKind::PermissionDenied => LogSetupError::PermissionDenied(self.path.clone()),
            _ => LogSetupError::CreateDir {
                path: self.path.clone(),
                source,
            },
        })?;

        let path = self.path.join(self.file_name(&Local::now()));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogSetupError::Open {
                path: path.clone(),
                source,
            })?;

        Ok((path, file))
    }
}

/// Install the global subscriber: console always, file when it can be opened.
///
/// Returns the log file path, or the reason file logging is disabled. Either
/// way the subscriber is installed. Call once per process.
pub fn init(settings: &LogSettings) -> Result<PathBuf, LogSetupError> {
    let (file_layer, opened) = match settings.open() {
        Ok((path, file)) => (
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            Ok(path),
        ),
        Err(e) => (None, Err(e)),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    opened
}
