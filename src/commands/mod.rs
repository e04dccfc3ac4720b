// Commands module - THE SURFACE
// Command groups, the registry that builds the command tree, and the
// session that lazily owns the device connection

mod enumeration;
mod exec;
mod file;
mod image;
mod os;
mod output;
mod registry;
mod session;
mod statistics;
mod terminal;
mod upgrade;

pub use enumeration::EnumerationGroup;
pub use exec::ExecGroup;
pub use file::FileGroup;
pub use image::ImageGroup;
pub use os::OsGroup;
pub use output::{print_json, render_json, split_words};
pub use registry::{CommandRegistry, RESERVED_NAMES};
pub use session::Session;
pub use statistics::StatisticsGroup;
pub use terminal::TerminalGroup;
pub use upgrade::UpgradeGroup;

use crate::config::LoggingError;
use crate::plugin::PluginLoadError;
use crate::session::{ConnectError, DispatchError, ProtocolError, TransferError};
use crate::smp::ImageInfoError;
use crate::transport::ConfigurationError;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use thiserror::Error;

// ============================================================================
// COMMAND ERRORS
// ============================================================================

/// Everything a command can fail with; rendered once by the CLI
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Inspection of FW image failed: {0}")]
    Image(#[from] ImageInfoError),

    #[error(transparent)]
    PluginLoad(#[from] PluginLoadError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("IO error: {0}")]
    Io(String),

    #[error("{0}")]
    Usage(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

impl CommandError {
    /// Whether the failure came from the user's input rather than the device
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Usage(_) | Self::UnknownCommand(_)
        )
    }
}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// ============================================================================
// COMMAND GROUP
// ============================================================================

/// A named set of subcommands, built in or loaded from a plugin
#[async_trait]
pub trait CommandGroup: Send + Sync {
    /// Name of the group's subcommand
    fn name(&self) -> &'static str;

    /// The clap definition for the group and its subcommands
    fn command(&self) -> Command;

    /// Run the group with the matches for its own subcommand
    async fn run(&self, session: &mut Session, matches: &ArgMatches) -> Result<(), CommandError>;
}

/// Name and matches of the subcommand selected under a group
pub(crate) fn selected(matches: &ArgMatches) -> Result<(&str, &ArgMatches), CommandError> {
    matches
        .subcommand()
        .ok_or_else(|| CommandError::Usage("A subcommand is required, see --help".to_string()))
}
