//! Logging infrastructure for the biz-log pipeline.
//!
//! Pipeline diagnostics are emitted through `tracing` under the [`BIZ_LOG_TARGET`]
//! target. Hosts that do not install their own subscriber can call [`init`].
//! The console storage writes audit records to the same target, so
//! [`LogConfig::pipeline_level`] controls both.

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Tracing target used by every pipeline component.
pub const BIZ_LOG_TARGET: &str = "biz-log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Level for everything outside the pipeline.
    pub level: LogLevel,
    /// Level for the `biz-log` target; `None` inherits `level`.
    pub pipeline_level: Option<LogLevel>,
    pub format: LogFormat,
    /// Also append to this file, without ANSI colors.
    pub file_path: Option<PathBuf>,
    /// Include file and line of each event.
    pub source_location: bool,
    /// Log span open/close, which times each dispatch and storage write.
    pub span_events: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Lowercase directive understood by `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl LogConfig {
    /// Read `BIZLOG_LOG_*` variables over the defaults.
    ///
    /// `BIZLOG_LOG_LEVEL` falls back to `RUST_LOG` when the latter is a bare
    /// level. Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let var = |name: &str| std::env::var(name).ok();

        if let Some(level) = var("BIZLOG_LOG_LEVEL")
            .or_else(|| var("RUST_LOG"))
            .and_then(|l| LogLevel::parse(&l))
        {
            config.level = level;
        }
        config.pipeline_level = var("BIZLOG_LOG_PIPELINE_LEVEL").and_then(|l| LogLevel::parse(&l));
        if let Some(format) = var("BIZLOG_LOG_FORMAT").and_then(|f| LogFormat::parse(&f)) {
            config.format = format;
        }
        config.file_path = var("BIZLOG_LOG_FILE").map(PathBuf::from);
        config.source_location = var("BIZLOG_LOG_SOURCE").is_some_and(|v| is_truthy(&v));
        config.span_events = var("BIZLOG_LOG_SPANS").is_some_and(|v| is_truthy(&v));
        config
    }

    /// `EnvFilter` directives for this configuration.
    pub fn directives(&self) -> String {
        match self.pipeline_level {
            Some(pipeline) => format!("{},{}={}", self.level.as_str(), BIZ_LOG_TARGET, pipeline.as_str()),
            None => self.level.as_str().to_string(),
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn layer<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
    {
        let base = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_span_events(self.span_events());
        match self.format {
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Compact => base.compact().boxed(),
            LogFormat::Json => base.json().boxed(),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Install the global subscriber: stderr, plus the log file when configured.
///
/// `RUST_LOG` directives win over [`LogConfig::directives`] when they parse.
/// Fails with [`LogError::InitError`] when a global subscriber is already set.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directives()))
        .map_err(|e| LogError::InitError(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = vec![config.layer(io::stderr, true)];
    if let Some(path) = &config.file_path {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        layers.push(config.layer(Mutex::new(file), false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::InitError(e.to_string()))
}

/// Logging errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to initialize logging: {0}")]
    InitError(String),

    #[error("failed to open log file: {0}")]
    FileError(#[from] io::Error),
}

/// Convenience macros re-exported from tracing.
pub use tracing::{debug, error, info, trace, warn};

/// Spans and timers for pipeline operations.
pub mod spans;
