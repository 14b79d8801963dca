//! # Logger
//!
//! Global `tracing` subscriber setup for the linkfix binaries.
//!
//! * Console output on stderr in compact, pretty or JSON format.
//! * Optional rolling log files written through a non-blocking worker.
//! * `RUST_LOG` is honored; [`LoggerBuilder::env_filter`] sets a programmatic default
//!   such as `"linkfix_core=debug,linkfix_storage=info"`.
//!
//! ## Example
//!
//! ```rust
//! # use linkfix_logger::{LevelFilter, LogFormat, Logger};
//! let _logger = Logger::builder()
//!     .name("linkfix")
//!     .console(true)
//!     .console_format(LogFormat::Compact)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use private::Sealed;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_MAX_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";

/// Output format of a logging layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(LoggerError::InvalidConfiguration {
                message: format!("Unknown log format '{other}'").into(),
                context: Some("Expected one of: compact, pretty, json".into()),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct LoggerConfig {
    console: bool,
    console_format: LogFormat,
    directory: Option<PathBuf>,
    file_format: LogFormat,
    rotation: Rotation,
    max_files: usize,
    level: LevelFilter,
    env_filter: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            console: true,
            console_format: LogFormat::Compact,
            directory: None,
            file_format: LogFormat::Compact,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            level: LevelFilter::INFO,
            env_filter: None,
        }
    }
}

#[derive(Debug)]
pub struct NoName;
#[derive(Debug)]
pub struct WithName(String);

mod private {
    pub trait Sealed {}
}
impl Sealed for NoName {}
impl Sealed for WithName {}

/// A builder for configuring and installing the global tracing subscriber.
///
/// A name is mandatory; it prefixes rolling log files (`linkfix.2026-10-16.log`).
#[derive(Debug)]
pub struct LoggerBuilder<N: Sealed = NoName> {
    name: N,
    config: LoggerConfig,
}

impl LoggerBuilder<NoName> {
    /// Sets the name of the logger.
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<WithName> {
        LoggerBuilder { name: WithName(name.into()), config: self.config }
    }
}

impl LoggerBuilder<WithName> {
    /// Minimum level emitted when neither `RUST_LOG` nor an env filter says otherwise.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.config.level = level;
        self
    }

    /// Adds an explicit env filter (e.g., `linkfix_core=debug`).
    ///
    /// Invalid filters make [`LoggerBuilder::init`] fail.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.env_filter = Some(filter.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.config.console = enabled;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console_format(mut self, format: LogFormat) -> Self {
        self.config.console_format = format;
        self
    }

    /// Enables rolling file output into `directory`.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.config.directory = Some(directory.into());
        self
    }

    /// Format of the file layer. Ignored without [`LoggerBuilder::directory`].
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn file_format(mut self, format: LogFormat) -> Self {
        self.config.file_format = format;
        self
    }

    /// Rotation strategy of the file layer. Ignored without [`LoggerBuilder::directory`].
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.config.rotation = rotation;
        self
    }

    /// Number of rotated files to keep. Ignored without [`LoggerBuilder::directory`].
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.config.max_files = max;
        self
    }

    /// Consumes the builder and installs the global tracing subscriber.
    ///
    /// The returned [`Logger`] owns the file worker guard; keep it alive until shutdown
    /// so buffered lines are flushed.
    ///
    /// # Errors
    /// * [`LoggerError::Subscriber`] if a global subscriber is already installed.
    /// * [`LoggerError::InvalidConfiguration`] for an empty name, zero `max_files`,
    ///   an invalid env filter or when no layer is enabled.
    /// * [`LoggerError::Io`] / [`LoggerError::Appender`] if the log directory cannot be used.
    pub fn init(self) -> Result<Logger, LoggerError> {
        validate_config(&self.config, &self.name.0)?;

        let env_filter = build_env_filter(&self.config)?;

        let mut layers = Vec::new();

        if self.config.console {
            let console = layer().with_writer(std::io::stderr).with_ansi(true);
            layers.push(match self.config.console_format {
                LogFormat::Compact => console.compact().boxed(),
                LogFormat::Pretty => console.pretty().boxed(),
                LogFormat::Json => console.json().boxed(),
            });
        }

        let guard = match &self.config.directory {
            Some(directory) => {
                fs::create_dir_all(directory)
                    .context(format!("Failed to create log directory: {}", directory.display()))?;

                let appender = RollingFileAppender::builder()
                    .rotation(self.config.rotation.clone())
                    .filename_prefix(&self.name.0)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(self.config.max_files)
                    .build(directory)?;

                let (writer, guard) = tracing_appender::non_blocking(appender);
                let file = layer().with_writer(writer).with_ansi(false);
                layers.push(match self.config.file_format {
                    LogFormat::Compact => file.compact().boxed(),
                    LogFormat::Pretty => file.pretty().boxed(),
                    LogFormat::Json => file.json().boxed(),
                });
                Some(guard)
            },
            None => None,
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging layers enabled. Enable console or file output.".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(env_filter).with(layers).try_init()?;

        Ok(Logger { guard })
    }
}

/// Handle to the installed logging system.
///
/// Dropping it stops the background file writer after flushing.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder { name: NoName, config: LoggerConfig::default() }
    }

    /// Returns `true` when a file layer is active.
    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn validate_config(config: &LoggerConfig, name: &str) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "Logger name cannot be empty".into(),
            context: None,
        });
    }

    if config.directory.is_some() && config.max_files == 0 {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be greater than zero".into(),
            context: None,
        });
    }

    Ok(())
}

fn build_env_filter(config: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(config.level.into());
    config.env_filter.as_ref().map_or_else(
        || Ok(builder.from_env_lossy()),
        |filter| {
            builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid env filter '{filter}': {e}").into(),
                context: None,
            })
        },
    )
}
