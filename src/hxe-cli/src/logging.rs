//! Logging infrastructure using `tracing` and `tracing-subscriber`.
//!
//! Events go to stderr and, when a log file is given, to that file as well.
//! The file is rotated once it passes [`MAX_LOG_SIZE`]: the previous log is
//! kept as `hxe.log.1` and a fresh file is started.
//!
//! `RUST_LOG` overrides the level picked from `-v`.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log file name inside the config directory
pub const LOG_FILE: &str = "hxe.log";

/// Size at which the log file is rotated
pub const MAX_LOG_SIZE: u64 = 1024 * 1024;

/// - 0 (no `-v`): info level
/// - 1 (`-v`): debug level
/// - 2+ (`-vv`): trace level
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut rotated = path.as_os_str().to_owned();
    rotated.push(".1");
    PathBuf::from(rotated)
}

/// Move `path` aside to `path.1` if it has grown past [`MAX_LOG_SIZE`].
///
/// Returns true when the file was rotated.
pub fn rotate(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() >= MAX_LOG_SIZE => {
            fs::rename(path, rotated_path(path))?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup.
pub fn init_logging(verbosity: u8, log_file: Option<&Path>) -> io::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            rotate(path)?;
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(SharedFileWriter::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(build_env_filter(level_for(verbosity)))
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(file_layer)
        .init();
    Ok(())
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<fs::File>>,
}

impl SharedFileWriter {
    fn new(file: fs::File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<fs::File>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,hxe={level},hxe_cli={level}")))
}
