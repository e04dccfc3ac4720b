// Command Registry - Built-in and plugin groups keyed by subcommand name

use crate::commands::{
    CommandError, CommandGroup, EnumerationGroup, ExecGroup, FileGroup, ImageGroup, OsGroup,
    Session, StatisticsGroup, TerminalGroup, UpgradeGroup,
};
use crate::plugin::Plugin;
use clap::{ArgMatches, Command};
use std::sync::Arc;
use tracing::warn;

/// Names the CLI itself owns; groups may not take them
pub const RESERVED_NAMES: &[&str] = &["shell", "help"];

/// The command groups available to the CLI, in registration order
#[derive(Default)]
pub struct CommandRegistry {
    groups: Vec<Arc<dyn CommandGroup>>,
    // Keeps plugin libraries loaded while their groups are reachable
    plugins: Vec<Plugin>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in group
    pub fn with_builtin_groups() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(OsGroup));
        registry.register(Arc::new(ImageGroup));
        registry.register(Arc::new(FileGroup));
        registry.register(Arc::new(StatisticsGroup));
        registry.register(Arc::new(EnumerationGroup));
        registry.register(Arc::new(ExecGroup));
        registry.register(Arc::new(TerminalGroup));
        registry.register(Arc::new(UpgradeGroup));
        registry
    }

    /// Add a group; a group with the same name is replaced and returned
    pub fn register(&mut self, group: Arc<dyn CommandGroup>) -> Option<Arc<dyn CommandGroup>> {
        let name = group.name();
        if RESERVED_NAMES.contains(&name) {
            warn!("Ignoring command group `{}`: the name is reserved", name);
            return None;
        }

        let shadowed = self
            .groups
            .iter()
            .position(|g| g.name() == name)
            .map(|index| self.groups.remove(index));
        if shadowed.is_some() {
            warn!("Command group `{}` replaces an earlier group of the same name", name);
        }
        self.groups.push(group);
        shadowed
    }

    /// Register plugin groups after the built-ins, in discovery order
    ///
    /// Returns the names of groups a plugin replaced.
    pub fn register_plugins(&mut self, plugins: Vec<Plugin>) -> Vec<&'static str> {
        let mut shadowed = Vec::new();
        for plugin in plugins {
            if let Some(previous) = self.register(plugin.group()) {
                warn!(
                    "Plugin {} shadows command group `{}`",
                    plugin.source_path().display(),
                    previous.name()
                );
                shadowed.push(previous.name());
            }
            self.plugins.push(plugin);
        }
        shadowed
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandGroup>> {
        self.groups.iter().find(|g| g.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.groups.iter().map(|g| g.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Attach every group as a subcommand of `root`
    pub fn augment(&self, root: Command) -> Command {
        root.subcommands(self.groups.iter().map(|g| g.command().name(g.name())))
    }

    /// Run the group selected in `matches`
    pub async fn dispatch(&self, session: &mut Session, matches: &ArgMatches) -> Result<(), CommandError> {
        let (name, sub) = matches
            .subcommand()
            .ok_or_else(|| CommandError::Usage("A command is required, see --help".to_string()))?;
        let group = self
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        group.run(session, sub).await
    }
}
