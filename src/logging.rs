//! Tracing subscriber setup.
//!
//! Every event goes both to stdout and to the log file given on the
//! command line. The file is truncated on start and is the only durable
//! record of a run.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::CheckerError;

/// Timestamp layout of every log line.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Installs the global subscriber. Level defaults to `info` and can be
/// overridden with `RUST_LOG`.
///
/// # Errors
///
/// Returns [`CheckerError::Logging`] if the log file cannot be created or a
/// global subscriber is already installed.
pub fn init(log_file: &Path) -> Result<(), CheckerError> {
    let file = open_log_file(log_file)?;
    let timer = ChronoLocal::new(TIME_FORMAT.to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_timer(timer.clone())
                .with_file(true)
                .with_line_number(true),
        )
        .with(
            fmt::layer()
                .with_timer(timer)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| CheckerError::Logging(e.to_string()))
}

fn open_log_file(path: &Path) -> Result<File, CheckerError> {
    File::create(path)
        .map_err(|e| CheckerError::Logging(format!("cannot open {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_log_path_is_reported() {
        let path = Path::new("/nonexistent-upgrade-post-checker-dir/checker.log");
        let result = open_log_file(path);
        let Err(CheckerError::Logging(msg)) = result else {
            unreachable!("directory does not exist");
        };
        assert!(msg.contains("checker.log"));
    }

    #[test]
    fn log_file_is_truncated_on_open() {
        let path = std::env::temp_dir().join(format!("upc-log-{}.log", std::process::id()));
        assert!(std::fs::write(&path, "previous run").is_ok());
        assert!(open_log_file(&path).is_ok());
        let len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(u64::MAX);
        assert_eq!(len, 0);
        let _ = std::fs::remove_file(&path);
    }
}
