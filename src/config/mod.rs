// Config module - Command-line options, session settings and logging setup

mod logging;
mod options;

pub use options::{parse_seconds, Cli, GlobalArgs, LogLevel, SessionOptions, DEFAULT_TIMEOUT_SECS};

pub use logging::{LogConfig, Logging, LoggingError, DEFAULT_LOG_LEVEL};
