//! Logging setup shared by the floral binaries.
//!
//! Everything goes to a size-rotated file under `$FLORAL_HOME/logs` and to
//! stderr. Stdout is never written: in MCP mode it carries the protocol.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "floral=info,floral_mcp=info,floral_intent=info,floral_taxonomy=info";
const VERBOSE_LOG_FILTER: &str = "floral=debug,floral_mcp=debug,floral_intent=debug,floral_taxonomy=debug";
const LOG_FILES_KEPT: usize = 5;
const LOG_FILE_BYTES: u64 = 10 * 1024 * 1024;

pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Only warnings reach stderr. The log file keeps the full filter.
    pub quiet_console: bool,
    /// Overrides `$FLORAL_HOME/logs`.
    pub log_dir: Option<PathBuf>,
}

/// Initialize tracing with a rolling file writer and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = match config.log_dir {
        Some(dir) => {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
            dir
        }
        None => ensure_logs_dir().context("Failed to ensure log directory")?,
    };
    let file_writer = RotatingLogWriter::new(log_dir, config.app_name)
        .context("Failed to initialize rolling log writer")?;

    let default_filter = if config.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console_filter = if config.quiet_console && !config.verbose {
        EnvFilter::new("warn")
    } else {
        file_filter.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Home directory: `$FLORAL_HOME`, else `~/.floral_mcp`, else a temp dir.
pub fn floral_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("FLORAL_HOME") {
        if !override_path.is_empty() {
            return PathBuf::from(override_path);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".floral_mcp")
}

pub fn logs_dir() -> PathBuf {
    floral_home().join("logs")
}

pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

struct SizeRotatedFile {
    dir: PathBuf,
    base_name: String,
    max_files: usize,
    max_size: u64,
    file: Option<File>,
    active_size: u64,
}

impl SizeRotatedFile {
    /// Opens (or resumes) `<dir>/<stem>.log`. An existing file already past
    /// `max_size` is rotated away first.
    fn new(dir: PathBuf, base_name: &str, max_files: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let mut log = Self {
            dir,
            base_name: file_stem(base_name),
            max_files: max_files.max(1),
            max_size,
            file: None,
            active_size: 0,
        };
        let (file, size) = log.open_active()?;
        log.file = Some(file);
        log.active_size = size;
        if size > max_size {
            log.rotate()?;
        }
        Ok(log)
    }

    fn open_active(&self) -> io::Result<(File, u64)> {
        let path = self.active_path();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        Ok((file, size))
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.base_name))
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.base_name, index))
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
        self.shift_backups()?;

        let (file, size) = self.open_active()?;
        self.file = Some(file);
        self.active_size = size;
        Ok(())
    }

    /// `name.log.N-1` -> `name.log.N` down to `name.log` -> `name.log.1`.
    /// The oldest file past `max_files` is removed.
    fn shift_backups(&self) -> io::Result<()> {
        let max_index = self.max_files.saturating_sub(1);
        let current = self.active_path();
        if max_index == 0 {
            if current.exists() {
                fs::remove_file(current)?;
            }
            return Ok(());
        }

        let oldest = self.backup_path(max_index);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for idx in (1..max_index).rev() {
            let src = self.backup_path(idx);
            if src.exists() {
                fs::rename(&src, self.backup_path(idx + 1))?;
            }
        }
        if current.exists() {
            fs::rename(current, self.backup_path(1))?;
        }
        Ok(())
    }
}

impl Write for SizeRotatedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.active_size > 0 && self.active_size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }

        let Some(file) = self.file.as_mut() else {
            return Err(io::Error::other("log file unavailable"));
        };
        let written = file.write(buf)?;
        self.active_size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

#[derive(Clone)]
struct RotatingLogWriter {
    inner: Arc<Mutex<SizeRotatedFile>>,
}

impl RotatingLogWriter {
    fn new(dir: PathBuf, base_name: &str) -> Result<Self> {
        let file = SizeRotatedFile::new(dir, base_name, LOG_FILES_KEPT, LOG_FILE_BYTES)
            .with_context(|| format!("Failed to open {base_name} log file"))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }
}

struct LogFileHandle {
    inner: Arc<Mutex<SizeRotatedFile>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RotatingLogWriter {
    type Writer = LogFileHandle;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl LogFileHandle {
    fn with_file<T>(&self, f: impl FnOnce(&mut SizeRotatedFile) -> io::Result<T>) -> io::Result<T> {
        let mut log = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))?;
        f(&mut *log)
    }
}

impl Write for LogFileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|log| log.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|log| log.flush())
    }
}

/// Log file stem for an app name: anything outside `[A-Za-z0-9_-]` becomes `_`.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => ch,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("floral mcp/1"), "floral_mcp_1");
        assert_eq!(file_stem("floral-mcp_2"), "floral-mcp_2");
    }

    #[test]
    fn test_appender_writes_current_file() {
        let dir = TempDir::new().unwrap();
        let mut appender =
            SizeRotatedFile::new(dir.path().to_path_buf(), "floral", 3, 1024).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        let content = fs::read_to_string(dir.path().join("floral.log")).unwrap();
        assert_eq!(content, "hello\n");
    }

    #[test]
    fn test_appender_rotates_and_caps_file_count() {
        let dir = TempDir::new().unwrap();
        let mut appender =
            SizeRotatedFile::new(dir.path().to_path_buf(), "floral", 3, 8).unwrap();
        for line in ["aaaaaa\n", "bbbbbb\n", "cccccc\n", "dddddd\n"] {
            appender.write_all(line.as_bytes()).unwrap();
        }
        appender.flush().unwrap();

        let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("floral.log"), "dddddd\n");
        assert_eq!(read("floral.log.1"), "cccccc\n");
        assert_eq!(read("floral.log.2"), "bbbbbb\n");
        assert!(!dir.path().join("floral.log.3").exists());
    }

    #[test]
    fn test_appender_resumes_existing_size() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("floral.log"), "0123456789").unwrap();
        let appender =
            SizeRotatedFile::new(dir.path().to_path_buf(), "floral", 2, 4).unwrap();
        assert_eq!(appender.active_size, 0);
        assert!(dir.path().join("floral.log.1").exists());
    }
}
