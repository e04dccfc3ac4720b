// Logging - Console and file log layers driven by an explicit LogConfig
//
// The console filter sits behind a reload layer so a running shell can swap
// it. The file layer is fixed for the life of the process.

use crate::config::{GlobalArgs, LogLevel};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

/// Console level when neither `--loglevel` nor `RUST_LOG` says otherwise
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::WARN;

#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    #[error("Cannot open log file {path}: {reason}")]
    LogFile { path: PathBuf, reason: String },

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("Cannot apply log filter: {0}")]
    Reload(String),
}

// ============================================================================
// LOG CONFIG
// ============================================================================

/// Where logs go and how much of them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Option<LogLevel>,
    pub file: Option<PathBuf>,
}

impl LogConfig {
    pub fn from_args(args: &GlobalArgs) -> Self {
        Self {
            level: args.loglevel,
            file: args.logfile.clone(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_file(mut self, path: PathBuf) -> Self {
        self.file = Some(path);
        self
    }

    /// Console filter; an explicit level wins over `RUST_LOG`
    pub fn console_filter(&self) -> EnvFilter {
        match self.level {
            Some(level) => EnvFilter::default().add_directive(level.level_filter().into()),
            None => EnvFilter::builder()
                .with_default_directive(DEFAULT_LOG_LEVEL.into())
                .from_env_lossy(),
        }
    }
}

// ============================================================================
// LOGGING HANDLE
// ============================================================================

/// The installed subscriber's console filter and the config it came from
pub struct Logging {
    handle: reload::Handle<EnvFilter, Registry>,
    config: LogConfig,
}

impl Logging {
    /// Install the global subscriber; may be called once per process
    pub fn init(config: LogConfig) -> Result<Self, LoggingError> {
        let (filter, handle) = reload::Layer::new(config.console_filter());
        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter);

        let file = match &config.file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| LoggingError::LogFile {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file))
                        .with_filter(LevelFilter::DEBUG),
                )
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(console)
            .with(file)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        Ok(Self { handle, config })
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Replace the console configuration wholesale
    ///
    /// The log file chosen at startup stays in place; a different file in
    /// `config` is reported and ignored.
    pub fn apply(&mut self, config: LogConfig) -> Result<(), LoggingError> {
        if config.file.is_some() && config.file != self.config.file {
            warn!("The log file cannot be changed in a running session");
        }
        self.handle
            .reload(config.console_filter())
            .map_err(|e| LoggingError::Reload(e.to_string()))?;
        self.config = LogConfig {
            level: config.level,
            file: self.config.file.clone(),
        };
        Ok(())
    }
}
