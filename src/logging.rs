//! Log sink: tracing subscriber with a stderr layer and an append-only file.
//!
//! File lines look like `[2025-03-14 09:26:53] Heartbeat delivered status=200`:
//! local timestamp in brackets, then the message and its fields. No level,
//! no target, no ANSI colour, no rotation.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::fmt::format::{DefaultFields, Format, Full, Writer};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Timestamp prefix `[YYYY-MM-DD HH:MM:SS]` in local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTimestamp;

impl FormatTime for LogTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Cannot open log file {}: {}", .0.display(), .1)]
    Open(PathBuf, std::io::Error),
    #[error("Invalid log filter {0:?}: {1}")]
    Filter(String, tracing_subscriber::filter::ParseError),
    #[error("A global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Formatting layer writing sink-formatted lines to `writer`.
///
/// Public so tests can point it at an in-memory buffer.
pub fn sink_layer<S, W>(writer: W) -> tracing_subscriber::fmt::Layer<S, DefaultFields, Format<Full, LogTimestamp>, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_timer(LogTimestamp)
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
}

/// Open `path` for appending, creating it and its parent directory.
pub fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LoggingError::Open(path.to_path_buf(), e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggingError::Open(path.to_path_buf(), e))
}

/// Install the global subscriber: `RUST_LOG` (or `config.level`) filter,
/// a stderr layer for interactive runs, and the file sink.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LoggingError::Filter(config.level.clone(), e))?,
    };

    let file = open_log_file(&config.file)?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(sink_layer(Mutex::new(file)))
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_sink_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("log.txt");
        let file = open_log_file(&path).unwrap();

        let subscriber = tracing_subscriber::registry().with(sink_layer(Mutex::new(file)));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(pid = 42, "Killed ServUni2.exe");
            tracing::warn!("Heartbeat rejected");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let re = regex::Regex::new(r"^\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\] ").unwrap();
        for line in &lines {
            assert!(re.is_match(line), "bad prefix: {line}");
            assert!(!line.contains("INFO") && !line.contains("WARN"));
        }
        assert!(lines[0].contains("Killed ServUni2.exe"));
        assert!(lines[0].contains("pid=42"));
    }

    #[test]
    fn test_sink_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "[2024-01-01 00:00:00] earlier run\n").unwrap();

        let file = open_log_file(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(sink_layer(Mutex::new(file)));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("later run");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("[2024-01-01 00:00:00] earlier run\n"));
        assert!(contents.trim_end().ends_with("later run"));
    }
}
