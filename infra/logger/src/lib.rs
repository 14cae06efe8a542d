//! # Logger
//!
//! Installs the process-wide `tracing` subscriber used by every cadmin crate.
//!
//! * A compact ANSI console layer.
//! * An optional rolling file layer (plain or JSON) written through a
//!   non-blocking `tracing-appender` worker.
//! * Level plus optional directives (e.g., `"cadmin_tracking=debug"`); `RUST_LOG`
//!   applies when no directives are given.
//!
//! Configure it with the typed [`LoggerBuilder`] or straight from the `logging`
//! section of the engine configuration with [`Logger::from_config`].
//!
//! ## Example
//!
//! ```rust
//! # use cadmin_logger::{Logger, LevelFilter};
//! let _logger = Logger::builder()
//!     .name("cadmin")
//!     .console(true)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use cadmin_domain::config::LoggingConfig;
use private::Sealed;
use std::fs;
use std::marker::PhantomData;
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

#[derive(Debug)]
struct Settings {
    console: bool,
    path: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    json: bool,
    env_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            console: true,
            path: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
            env_filter: None,
        }
    }
}

#[derive(Debug)]
pub struct NoName;
#[derive(Debug)]
pub struct WithName(String);
#[derive(Debug)]
pub struct NoFile;
#[derive(Debug)]
pub struct WithFile;

mod private {
    pub trait Sealed {}
}
impl Sealed for NoName {}
impl Sealed for WithName {}
impl Sealed for NoFile {}
impl Sealed for WithFile {}

/// A builder for the global tracing subscriber.
///
/// File-only options (`max_files`, `rotation`, `json`) unlock after [`path`](LoggerBuilder::path).
#[derive(Debug)]
pub struct LoggerBuilder<N: Sealed = NoName, F: Sealed = NoFile> {
    settings: Settings,
    name: N,
    file_state: PhantomData<F>,
}

impl<F: Sealed> LoggerBuilder<NoName, F> {
    /// Sets the name of the logger; also the prefix of rolled log files.
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<WithName, F> {
        LoggerBuilder { name: WithName(name.into()), settings: self.settings, file_state: PhantomData }
    }
}

impl LoggerBuilder<WithName, WithFile> {
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.settings.max_files = max;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.settings.rotation = rotation;
        self
    }

    /// Writes the file layer as JSON lines.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn json(mut self) -> Self {
        self.settings.json = true;
        self
    }
}

impl<F: Sealed> LoggerBuilder<WithName, F> {
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.settings.level = level;
        self
    }

    /// Adds explicit filter directives (e.g., `cadmin_queue=trace`).
    ///
    /// Invalid directives make [`LoggerBuilder::init`] fail.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.settings.env_filter = Some(filter.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.settings.console = enabled;
        self
    }

    /// Directory for rolling log files. Created if missing.
    pub fn path(self, path: impl Into<PathBuf>) -> LoggerBuilder<WithName, WithFile> {
        let mut settings = self.settings;
        settings.path = Some(path.into());
        LoggerBuilder { settings, name: self.name, file_state: PhantomData }
    }

    /// Consumes the builder and installs the global tracing subscriber.
    ///
    /// The returned [`Logger`] owns the file writer's [`WorkerGuard`]; keep it
    /// alive until shutdown or buffered lines are lost.
    ///
    /// # Errors
    /// * [`LoggerError::Subscriber`] if a global subscriber has already been set.
    /// * [`LoggerError::InvalidConfiguration`] for invalid settings.
    pub fn init(self) -> Result<Logger, LoggerError> {
        install(&self.name.0, self.settings)
    }
}

/// A handle to the initialized logging system.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Returns a new [`LoggerBuilder`].
    ///
    /// ```rust
    /// use cadmin_logger::{LevelFilter, Logger};
    ///
    /// let _logger = Logger::builder()
    ///     .name("cadmin")
    ///     .level(LevelFilter::DEBUG)
    ///     .init()
    ///     .unwrap();
    /// ```
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder { settings: Settings::default(), name: NoName, file_state: PhantomData }
    }

    /// Installs the global subscriber from the `logging` configuration section.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an unknown level, bad directives,
    ///   an empty name, `max_files == 0` or when neither console nor file output is enabled.
    /// * [`LoggerError::Subscriber`] if a global subscriber is already installed.
    pub fn from_config(config: &LoggingConfig) -> Result<Self, LoggerError> {
        install(&config.name, settings_from(config)?)
    }

    /// `true` when a file writer is attached.
    #[must_use]
    pub const fn has_file_output(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::debug!("Logging system shutting down, flushing buffers");
        }
    }
}

fn settings_from(config: &LoggingConfig) -> Result<Settings, LoggerError> {
    let level = LevelFilter::from_str(config.level.trim()).map_err(|e| {
        LoggerError::InvalidConfiguration {
            message: format!("Unknown log level '{}': {e}", config.level).into(),
            context: None,
        }
    })?;

    Ok(Settings {
        console: config.console,
        path: config.path.clone(),
        level,
        max_files: config.max_files,
        json: config.json,
        env_filter: config.env_filter.clone(),
        ..Settings::default()
    })
}

fn install(name: &str, settings: Settings) -> Result<Logger, LoggerError> {
    validate(&settings, name)?;
    let env_filter = build_env_filter(&settings)?;

    let mut layers = Vec::new();
    if settings.console {
        layers.push(layer().compact().with_ansi(true).boxed());
    }

    let guard = match settings.path {
        Some(path) => {
            fs::create_dir_all(&path)
                .context(format!("Failed to create path: {}", path.display()))?;

            let file_appender = RollingFileAppender::builder()
                .rotation(settings.rotation)
                .filename_prefix(name)
                .filename_suffix(LOG_FILE_SUFFIX)
                .max_log_files(settings.max_files)
                .build(path)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = layer().with_writer(non_blocking).with_ansi(false);
            layers.push(if settings.json { file_layer.json().boxed() } else { file_layer.boxed() });
            Some(guard)
        },
        None => None,
    };

    tracing_subscriber::registry().with(env_filter).with(layers).try_init()?;
    Ok(Logger { guard })
}

fn validate(settings: &Settings, name: &str) -> Result<(), LoggerError> {
    let problem = if name.trim().is_empty() {
        "Logger name cannot be empty"
    } else if settings.max_files == 0 {
        "max_files must be greater than zero"
    } else if !settings.console && settings.path.is_none() {
        "No logging layers enabled. Enable console or file output."
    } else {
        return Ok(());
    };

    Err(LoggerError::InvalidConfiguration { message: problem.into(), context: None })
}

fn build_env_filter(settings: &Settings) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(settings.level.into());
    settings.env_filter.as_ref().map_or_else(
        || Ok(builder.from_env_lossy()),
        |filter| {
            builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid env filter '{filter}': {e}").into(),
                context: None,
            })
        },
    )
}
