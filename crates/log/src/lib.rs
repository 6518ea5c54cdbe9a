//! Cowrite Logging - a structured logging bootstrap built on tracing
//!
//! This crate wires up the `tracing` ecosystem for the Cowrite workspace:
//! a log-level type that plugs into clap, a small configuration struct, and
//! an initializer supporting pretty, compact and JSON output.
//!
//! # Examples
//!
//! ```rust
//! use cowrite_log::{LogLevel, LogConfig, init_logger};
//!
//! init_logger(LogLevel::Info, &LogConfig::default()).unwrap();
//!
//! tracing::info!("Hello, world!");
//! tracing::debug!(user_id = 42, "User logged in");
//! ```

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, trace, warn};
pub use tracing::{debug_span, error_span, info_span, trace_span, warn_span};
pub use tracing::{event, span, Instrument, Level, Span};

#[derive(thiserror::Error)]
pub enum Error {
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("logger initialization failed: {0}")]
    InitializationFailed(String),
    #[error("tracing subscriber error: {0}")]
    TracingSubscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Format error messages for display
pub(crate) fn format_error(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter,
) -> std::fmt::Result {
    write!(f, "{e}")?;

    let mut source = e.source();

    if e.source().is_some() {
        writeln!(f, "\ncaused by:")?;
        let mut i: usize = 0;
        while let Some(inner) = source {
            writeln!(f, "{i: >5}: {inner}")?;
            source = inner.source();
            i += 1;
        }
    }

    Ok(())
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        format_error(self, f)
    }
}

/// Log level configuration
#[derive(ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Only show error messages
    Error,
    /// Show warnings and errors
    #[default]
    Warn,
    /// Show info, warnings, and errors
    Info,
    /// Show debug info and above
    Debug,
    /// Show all messages including trace
    Trace,
    /// Disable all logging
    Off,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
            LogLevel::Off => "off",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            "off" => Ok(LogLevel::Off),
            _ => Err(Self::Err::InvalidLogLevel(s.to_string())),
        }
    }
}

/// Convert LogLevel to tracing Level
impl From<LogLevel> for Option<Level> {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
            LogLevel::Off => None,
        }
    }
}

/// Convert LogLevel to an EnvFilter directive
impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_string()
    }
}

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,
    /// Whether to include timestamps
    pub with_timestamp: bool,
    /// Whether to include target module information
    pub with_target: bool,
    /// Whether to include thread information
    pub with_thread_names: bool,
    /// Whether to include line numbers
    pub with_line_number: bool,
    /// Custom environment filter (overrides log level if set)
    pub env_filter: Option<String>,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Pretty-printed output for human reading
    Pretty,
    /// Compact pretty-printed output
    Compact,
    /// JSON output for structured logging
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            with_timestamp: true,
            with_target: false,
            with_thread_names: false,
            with_line_number: false,
            env_filter: None,
        }
    }
}

/// Initialize the global tracing subscriber
pub fn init_logger(level: LogLevel, config: &LogConfig) -> Result<(), Error> {
    let directive = config
        .env_filter
        .clone()
        .unwrap_or_else(|| String::from(level));
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .map_err(|e| Error::InitializationFailed(e.to_string()))?;

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_target(config.with_target)
                .with_thread_names(config.with_thread_names)
                .with_line_number(config.with_line_number);

            let fmt_layer = if config.with_timestamp {
                fmt_layer.boxed()
            } else {
                fmt_layer.without_time().boxed()
            };

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_target(config.with_target)
                .with_thread_names(config.with_thread_names)
                .with_line_number(config.with_line_number);

            let fmt_layer = if config.with_timestamp {
                fmt_layer.boxed()
            } else {
                fmt_layer.without_time().boxed()
            };

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            #[cfg(feature = "json")]
            {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_thread_names(config.with_thread_names)
                    .with_line_number(config.with_line_number);

                let fmt_layer = if config.with_timestamp {
                    fmt_layer.boxed()
                } else {
                    fmt_layer.without_time().boxed()
                };

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .try_init()?;
            }
            #[cfg(not(feature = "json"))]
            {
                return Err(Error::InitializationFailed(
                    "JSON format requires 'json' feature to be enabled".to_string(),
                ));
            }
        }
    }

    Ok(())
}

/// Initialize the logger with the default configuration
pub fn init_simple_logger(level: LogLevel) -> Result<(), Error> {
    init_logger(level, &LogConfig::default())
}
