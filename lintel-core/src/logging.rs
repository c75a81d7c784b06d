//! Logging for Lintel applications
//!
//! Two layers live here:
//!
//! - [`LogConfig`] builds the global `tracing` subscriber (level, format and
//!   output, with rolling files through `tracing-appender`).
//! - [`Log`] is the logger *service* the application lifecycle talks to. The
//!   default implementation, [`TracingLogger`], reads `log.level`,
//!   `log.format` and `log.dir` from the configuration, installs the
//!   subscriber when it is constructed and forwards every entry to `tracing`.
//!
//! ```no_run
//! use lintel_core::logging::*;
//!
//! let _guard = LogConfig::new()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .init();
//!
//! info!("Logging initialized");
//! ```

use crate::class::Class;
use crate::{Error, Service};
use lintel_config::Config;
use parking_lot::Mutex;
use std::io;
use std::str::FromStr;
use std::sync::Arc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

// Re-export tracing for convenience
pub use tracing::{debug, error, info, trace, warn};

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Convert to string for EnvFilter
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

impl FromStr for LogLevel {
    type Err = Error;

    /// Accepts the PSR-3 names too; `notice` maps to info and
    /// `critical`/`alert`/`emergency` to error
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" | "notice" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" | "critical" | "alert" | "emergency" => Ok(LogLevel::Error),
            other => Err(Error::Internal(format!("Unknown log level: {}", other))),
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format (default) - structured, machine-readable
    Json,
    Plain,
    /// Pretty format - multi-line, for development
    Pretty,
    Compact,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "plain" | "text" => Ok(LogFormat::Plain),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(Error::Internal(format!("Unknown log format: {}", other))),
        }
    }
}

/// Output destination for logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Write to rotating log files
    RollingFile {
        directory: String,
        prefix: String,
        rotation: Rotation,
    },
}

/// File rotation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Hourly,
    Daily,
    Never,
}

impl Rotation {
    fn to_tracing_rotation(self) -> tracing_appender::rolling::Rotation {
        match self {
            Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
            Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
            Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Include target (module path)
    pub targets: bool,
    /// Include span close events
    pub spans: bool,
    /// Enable ANSI colors (for terminal output)
    pub colors: bool,
    /// Custom environment filter (overrides level if set)
    pub env_filter: Option<String>,
}

impl LogConfig {
    pub const CONFIG_LEVEL: &'static str = "log.level";
    pub const CONFIG_FORMAT: &'static str = "log.format";
    pub const CONFIG_DIR: &'static str = "log.dir";

    pub fn new() -> Self {
        Self::default()
    }

    /// Read `log.level`, `log.format` and `log.dir`
    ///
    /// With a `log.dir` the logs go to daily rotated files in that
    /// directory, which is created when missing. Without one they go to
    /// STDERR so STDOUT stays free for the response body.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let mut log_config = Self::new().output(LogOutput::Stderr);

        if let Some(level) = config.get_string(Self::CONFIG_LEVEL).filter(|s| !s.is_empty()) {
            log_config = log_config.level(level.parse()?);
        }
        if let Some(format) = config.get_string(Self::CONFIG_FORMAT).filter(|s| !s.is_empty()) {
            log_config = log_config.format(format.parse()?);
        }
        if let Some(dir) = config.get_string(Self::CONFIG_DIR).filter(|s| !s.is_empty()) {
            let directory = config.get_full_path(&dir);
            std::fs::create_dir_all(&directory)?;
            log_config = log_config.output(LogOutput::RollingFile {
                directory,
                prefix: "lintel.log".to_string(),
                rotation: Rotation::Daily,
            });
        }

        Ok(log_config)
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.spans = enable;
        self
    }

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    /// Set custom environment filter, like `"lintel_core=debug,hyper=info"`
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Install the global subscriber
    ///
    /// Returns the writer guard that flushes pending entries when dropped,
    /// or `None` when a global subscriber was already installed.
    pub fn init(&self) -> Option<WorkerGuard> {
        let env_filter = match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
        };

        let (writer, guard) = match &self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::RollingFile {
                directory,
                prefix,
                rotation,
            } => tracing_appender::non_blocking(tracing_appender::rolling::RollingFileAppender::new(
                rotation.to_tracing_rotation(),
                directory,
                prefix,
            )),
        };

        let fmt_span = if self.spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(self.targets)
            .with_span_events(fmt_span);
        let registry = tracing_subscriber::registry().with(env_filter);

        let installed = match self.format {
            LogFormat::Json => registry.with(layer.json()).try_init(),
            LogFormat::Plain => registry.with(layer.with_ansi(self.colors)).try_init(),
            LogFormat::Pretty => registry
                .with(layer.pretty().with_ansi(self.colors))
                .try_init(),
            LogFormat::Compact => registry
                .with(layer.compact().with_ansi(self.colors))
                .try_init(),
        };

        installed.ok().map(|_| guard)
    }
}

impl Default for LogConfig {
    /// JSON format to STDOUT at INFO level
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            targets: true,
            spans: false,
            colors: false,
            env_filter: None,
        }
    }
}

/// The logger service
pub trait Log: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
}

impl Service for dyn Log {
    const KEY: &'static str = "lintel::Logger";
}

/// [`Log`] implementation forwarding to `tracing`
pub struct TracingLogger {
    config: LogConfig,
    guard: Mutex<Option<WorkerGuard>>,
}

impl Service for TracingLogger {
    const KEY: &'static str = "lintel::TracingLogger";
}

impl TracingLogger {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            guard: Mutex::new(None),
        }
    }

    /// Container descriptor: configured from `Config`, viewable as `dyn Log`
    pub fn class() -> Class<TracingLogger> {
        Class::new(Self::KEY)
            .inject(Config::KEY)
            .implements(<dyn Log>::KEY, |logger| logger as Arc<dyn Log>)
            .construct(|args| {
                let config = args.service::<Config>()?;
                Ok(TracingLogger::new(LogConfig::from_config(&config)?))
            })
            .post_construct(|logger| {
                logger.install();
                Ok(())
            })
    }

    /// Install the global subscriber unless one is already present
    pub fn install(&self) {
        if let Some(guard) = self.config.init() {
            *self.guard.lock() = Some(guard);
        }
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }
}

impl Log for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => trace!(target: "lintel", "{}", message),
            LogLevel::Debug => debug!(target: "lintel", "{}", message),
            LogLevel::Info => info!(target: "lintel", "{}", message),
            LogLevel::Warn => warn!(target: "lintel", "{}", message),
            LogLevel::Error => error!(target: "lintel", "{}", message),
        }
    }
}
