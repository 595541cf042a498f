//! Tracing setup.
//!
//! Two sinks share the event stream: stderr for problems the operator
//! should see while the reporter draws progress, and an append-only log
//! file with every decision the installer made.

use chrono::Local;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

/// Timestamps in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Log level filter.
///
/// 1. `--debug` sets `reconkit=debug`
/// 2. `RUST_LOG` (if set)
/// 3. otherwise `fallback`
fn filter(debug: bool, fallback: &str) -> EnvFilter {
    if debug {
        EnvFilter::new("reconkit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    }
}

/// Open `path` for appending, creating it and its parent directories.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global subscriber.
///
/// The file sink logs at `info` by default. When the log file can't be
/// opened the run continues with stderr only. Calling this twice is a
/// no-op.
pub fn init_tracing(debug: bool, log_file: &Path) {
    let (file, open_error) = match open_log_file(log_file) {
        Ok(file) => (Some(file), None),
        Err(e) => (None, Some(e)),
    };

    let stderr_layer = tracing_fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(filter(debug, "reconkit=warn"));

    let file_layer = file.map(|file| {
        tracing_fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_timer(LocalTime)
            .with_filter(filter(debug, "reconkit=info"))
    });

    let subscriber = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return;
    }

    if let Some(e) = open_error {
        warn!(
            path = %log_file.display(),
            error = %e,
            "log file unavailable, logging to stderr only"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn log_file_is_created_with_parents_and_appended() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs/install.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn unwritable_log_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "").unwrap();

        assert!(open_log_file(&blocker.join("install.log")).is_err());
    }

    #[test]
    fn local_time_has_millisecond_precision() {
        let mut out = String::new();
        LocalTime.format_time(&mut Writer::new(&mut out)).unwrap();
        // 2026-10-17 09:30:00.123
        assert_eq!(out.len(), 23);
        assert_eq!(&out[4..5], "-");
        assert_eq!(&out[19..20], ".");
    }
}
