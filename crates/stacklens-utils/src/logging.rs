//! # Logging Utilities
//!
//! `tracing` subscriber setup for stacklens.
//!
//! Supports:
//! - Pretty output for development and JSON for machines
//! - `RUST_LOG` filtering, overridable by an explicit level
//! - An optional extra log file next to the console output
//! - A file-only mode for the terminal UI, which owns stdout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stacklens_utils::init_logging;
//!
//! // Keep the guard alive until exit so buffered file output is flushed
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=stacklens_core=debug`)
//! - `STACKLENS_LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
//! - `STACKLENS_LOG_FILE`: optional path of an additional log file

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fmt, io};

use chrono::{NaiveDate, Utc};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self as tracing_fmt, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_VAR: &str = "STACKLENS_LOG_FORMAT";
const FILE_VAR: &str = "STACKLENS_LOG_FILE";
const LOG_DIR: &str = ".stacklens";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat
{
    /// Human-readable output (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(Self::Pretty),
            "json" | "prod" | "production" => Ok(Self::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl LogLevel
{
    /// Directive understood by `EnvFilter`.
    #[must_use]
    pub const fn as_str(self) -> &'static str
    {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" | "dbg" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Where log output goes and how it looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig
{
    /// Overrides `RUST_LOG` when set.
    pub level: Option<LogLevel>,
    /// Output format for every destination.
    pub format: LogFormat,
    /// Extra file destination.
    pub file: Option<PathBuf>,
    /// Write to stdout as well.
    pub console: bool,
}

impl Default for LogConfig
{
    fn default() -> Self
    {
        Self { level: None, format: LogFormat::Pretty, file: None, console: true }
    }
}

impl LogConfig
{
    /// Read `STACKLENS_LOG_FORMAT` and `STACKLENS_LOG_FILE`.
    ///
    /// An unparsable format falls back to pretty output.
    #[must_use]
    pub fn from_env() -> Self
    {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self
    {
        let format = lookup(FORMAT_VAR).and_then(|value| value.parse().ok()).unwrap_or_default();
        let file = lookup(FILE_VAR).filter(|value| !value.is_empty()).map(PathBuf::from);
        Self { format, file, ..Self::default() }
    }

    /// Log only to `path`.
    #[must_use]
    pub fn file_only(path: PathBuf) -> Self
    {
        Self { file: Some(path), console: false, ..Self::default() }
    }

    /// Set or clear the explicit level.
    #[must_use]
    pub const fn with_level(mut self, level: Option<LogLevel>) -> Self
    {
        self.level = level;
        self
    }

    /// Choose the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self
    {
        self.format = format;
        self
    }

    fn filter(&self) -> EnvFilter
    {
        match self.level {
            Some(level) => EnvFilter::new(level.as_str()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LogLevel::Info.as_str())),
        }
    }

    /// Install the global subscriber.
    ///
    /// # Errors
    ///
    /// [`LoggingError::FileError`] if the log directory cannot be created,
    /// [`LoggingError::InitializationFailed`] if a subscriber is already set.
    pub fn init(self) -> Result<LogGuard, LoggingError>
    {
        let mut layers: Vec<BoxedLayer> = Vec::new();
        if self.console {
            layers.push(fmt_layer(self.format, io::stdout, true));
        }

        let mut worker = None;
        if let Some(path) = &self.file {
            let directory = path.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or(Path::new("."));
            std::fs::create_dir_all(directory)?;
            let file_name = path.file_name().ok_or_else(|| {
                LoggingError::FileError(io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not a file", path.display())))
            })?;

            // Dated names rotate by themselves, so never roll.
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt_layer(self.format, writer, false));
            worker = Some(guard);
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(self.filter())
            .try_init()
            .map_err(|error| LoggingError::InitializationFailed(error.to_string()))?;

        Ok(LogGuard { _worker: worker, file: self.file })
    }
}

/// Keeps buffered file output flowing. Drop it last.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LogGuard
{
    _worker: Option<WorkerGuard>,
    file: Option<PathBuf>,
}

impl LogGuard
{
    /// Log file in use, if any.
    #[must_use]
    pub fn file(&self) -> Option<&Path>
    {
        self.file.as_deref()
    }
}

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer);

    match format {
        LogFormat::Pretty => layer.with_ansi(ansi).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
    }
}

/// Initialize logging from the environment
///
/// ## Example
///
/// ```rust,no_run
/// use stacklens_utils::init_logging;
///
/// let _guard = init_logging().expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
///
/// ## Errors
///
/// See [`LogConfig::init`].
pub fn init_logging() -> Result<LogGuard, LoggingError>
{
    LogConfig::from_env().init()
}

/// Initialize logging with an explicit level and format
///
/// `STACKLENS_LOG_FILE` is still honoured.
///
/// ## Errors
///
/// See [`LogConfig::init`].
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LogGuard, LoggingError>
{
    LogConfig::from_env().with_level(Some(level)).with_format(format).init()
}

/// Initialize file-only logging for the terminal UI
///
/// Writes to `~/.stacklens/YYYY-MM-DD-stacklens-tui.log`, or to the system
/// temp directory when `HOME` is not set. With `level` unset, `RUST_LOG`
/// decides, defaulting to `info`.
///
/// ```rust,no_run
/// use stacklens_utils::{LogLevel, init_logging_for_tui};
///
/// let guard = init_logging_for_tui(Some(LogLevel::Debug)).expect("Failed to initialize logging for TUI");
/// println!("logging to {:?}", guard.file());
/// ```
///
/// ## Errors
///
/// See [`LogConfig::init`].
pub fn init_logging_for_tui(level: Option<LogLevel>) -> Result<LogGuard, LoggingError>
{
    let home = env::var_os("HOME").map(PathBuf::from);
    let path = tui_log_path(home.as_deref(), Utc::now().date_naive());
    LogConfig::file_only(path).with_level(level).init()
}

fn tui_log_path(home: Option<&Path>, today: NaiveDate) -> PathBuf
{
    let directory = home.map_or_else(env::temp_dir, |home| home.join(LOG_DIR));
    directory.join(format!("{}-stacklens-tui.log", today.format("%Y-%m-%d")))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Unknown log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Unknown log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// A global subscriber is already installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
