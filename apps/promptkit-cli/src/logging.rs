//! Logging initialization.
//!
//! Logs always go to stderr so stdout stays reserved for command output.
//! With `--log-file`, a second JSON layer appends to that file through a
//! non-blocking writer.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset and `--verbose` is off.
const DEFAULT_FILTER: &str = "warn";

/// Initialize the global tracing subscriber.
///
/// Returns a [`WorkerGuard`] when a log file is configured; it must be held
/// for the lifetime of the program so buffered lines are flushed.
///
/// # Errors
///
/// Returns an error if the log file or its directory cannot be created.
pub fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    if let Some((subscriber, guard)) = build_tracing(verbose, log_file)? {
        subscriber.init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter(verbose))
            .init();
        Ok(None)
    }
}

/// Build the dual-layer subscriber without registering it globally.
///
/// Returns `None` when no log file is configured.
fn build_tracing(
    verbose: bool,
    log_file: Option<&Path>,
) -> Result<Option<(impl tracing::Subscriber + Send + Sync, WorkerGuard)>> {
    let Some(path) = log_file else {
        return Ok(None);
    };

    let (non_blocking, guard) = open_log_writer(path)?;

    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter(verbose)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(env_filter(verbose)),
        );

    Ok(Some((subscriber, guard)))
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Create the parent directory and open `path` for appending.
fn open_log_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory: {}", dir.display()))?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;

    Ok(tracing_appender::non_blocking(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_log_dir_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs").join("promptkit.log");

        let (_writer, _guard) = open_log_writer(&path).unwrap();

        assert!(path.is_file(), "log file should be created");
    }

    #[test]
    fn test_should_append_to_existing_log_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("promptkit.log");
        fs::write(&path, "earlier line\n").unwrap();

        let (_writer, _guard) = open_log_writer(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier line"), "existing lines should be kept");
    }

    #[test]
    fn test_should_return_error_for_invalid_path() {
        let result = open_log_writer(Path::new("/dev/null/promptkit.log"));
        assert!(result.is_err(), "should fail when directory cannot be created");
    }

    #[test]
    fn test_should_return_none_without_log_file() {
        let result = build_tracing(false, None).unwrap();
        assert!(result.is_none(), "should return None when no log file is given");
    }

    #[test]
    fn test_should_build_layers_with_log_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("promptkit.log");
        let result = build_tracing(true, Some(&path)).unwrap();
        assert!(result.is_some());
    }
}
