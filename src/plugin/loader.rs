// Plugin Loader - Discover and load command groups from dynamic libraries
//
// Plugins are trusted native code. A loaded library runs with the full
// privileges of the process and nothing here sandboxes it; only load
// plugins from directories you control.

use crate::commands::CommandGroup;
use libloading::Library;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Bumped whenever `PluginDeclaration` or `CommandGroup` change shape
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// Symbol every plugin library exports
pub const PLUGIN_DECLARATION_SYMBOL: &[u8] = b"smpmgr_plugin_declaration\0";

/// Command-line flag naming a plugin directory
pub const PLUGIN_PATH_FLAG: &str = "--plugin-path";

/// File stem suffix marking a library as a command group plugin
pub const PLUGIN_FILE_SUFFIX: &str = "_group";

#[derive(Debug, Clone, Error)]
pub enum PluginLoadError {
    #[error("Invalid plugin path {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Cannot open plugin {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("Plugin {} does not export a plugin declaration: {reason}", path.display())]
    MissingDeclaration { path: PathBuf, reason: String },

    #[error("Plugin {} has an incompatible declaration: {reason}", path.display())]
    InvalidDeclaration { path: PathBuf, reason: String },
}

impl PluginLoadError {
    pub fn path(&self) -> &Path {
        match self {
            Self::InvalidPath { path, .. }
            | Self::Open { path, .. }
            | Self::MissingDeclaration { path, .. }
            | Self::InvalidDeclaration { path, .. } => path,
        }
    }
}

// ============================================================================
// DECLARATION
// ============================================================================

/// What a plugin library exports under `smpmgr_plugin_declaration`
///
/// Use [`export_plugin!`](crate::export_plugin) rather than building this by
/// hand. The library must be built with the same compiler and the same
/// version of this crate as the host.
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    pub abi_version: u32,
    pub core_version: &'static str,
    pub register: fn() -> Box<dyn CommandGroup>,
}

/// Export a command group from a plugin library
///
/// ```ignore
/// smpmgr::export_plugin!(|| Box::new(MyGroup));
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($register:expr) => {
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static smpmgr_plugin_declaration: $crate::plugin::PluginDeclaration =
            $crate::plugin::PluginDeclaration {
                abi_version: $crate::plugin::PLUGIN_ABI_VERSION,
                core_version: $crate::VERSION,
                register: $register,
            };
    };
}

// ============================================================================
// PLUGIN
// ============================================================================

/// A loaded command group and where it came from
pub struct Plugin {
    group: Arc<dyn CommandGroup>,
    source_path: PathBuf,
    // Declared last: the group's code lives in this library
    _library: Option<Arc<Library>>,
}

impl Plugin {
    /// A plugin whose code is already linked into the process
    pub fn new(group: Box<dyn CommandGroup>, source_path: PathBuf) -> Self {
        Self {
            group: Arc::from(group),
            source_path,
            _library: None,
        }
    }

    fn with_library(group: Box<dyn CommandGroup>, source_path: PathBuf, library: Library) -> Self {
        Self {
            group: Arc::from(group),
            source_path,
            _library: Some(Arc::new(library)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.group.name()
    }

    pub fn group(&self) -> Arc<dyn CommandGroup> {
        Arc::clone(&self.group)
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .field("source_path", &self.source_path)
            .field("native", &self._library.is_some())
            .finish()
    }
}

// ============================================================================
// LOADERS
// ============================================================================

/// Turns a plugin file into a command group
pub trait ModuleLoader {
    fn load(&self, path: &Path) -> Result<Plugin, PluginLoadError>;
}

/// Loads plugins as native dynamic libraries
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

impl ModuleLoader for DylibLoader {
    fn load(&self, path: &Path) -> Result<Plugin, PluginLoadError> {
        // SAFETY: loading runs the library's initializers; plugins are trusted
        let library = unsafe { Library::new(path) }.map_err(|e| PluginLoadError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // SAFETY: the symbol is a `PluginDeclaration` static when exported by
        // `export_plugin!`; the copy is only used while `library` is alive
        let declaration = unsafe {
            let symbol = library
                .get::<*const PluginDeclaration>(PLUGIN_DECLARATION_SYMBOL)
                .map_err(|e| PluginLoadError::MissingDeclaration {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            (*symbol).read()
        };

        if declaration.abi_version != PLUGIN_ABI_VERSION {
            return Err(PluginLoadError::InvalidDeclaration {
                path: path.to_path_buf(),
                reason: format!(
                    "ABI version {} (expected {})",
                    declaration.abi_version, PLUGIN_ABI_VERSION
                ),
            });
        }
        if declaration.core_version != crate::VERSION {
            return Err(PluginLoadError::InvalidDeclaration {
                path: path.to_path_buf(),
                reason: format!(
                    "built against smpmgr {} (this is {})",
                    declaration.core_version,
                    crate::VERSION
                ),
            });
        }

        let group = (declaration.register)();
        debug!("Plugin {} registered group `{}`", path.display(), group.name());
        Ok(Plugin::with_library(group, path.to_path_buf(), library))
    }
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// Whether `path` names a command group library for this platform
pub fn is_plugin_file(path: &Path) -> bool {
    if path.extension() != Some(OsStr::new(std::env::consts::DLL_EXTENSION)) {
        return false;
    }
    path.file_stem()
        .and_then(OsStr::to_str)
        .map(|stem| stem.strip_prefix("lib").unwrap_or(stem))
        .is_some_and(|stem| stem.len() > PLUGIN_FILE_SUFFIX.len() && stem.ends_with(PLUGIN_FILE_SUFFIX))
}

/// Plugin files in `dir`, sorted by file name
pub fn plugin_files(dir: &Path) -> Result<Vec<PathBuf>, PluginLoadError> {
    let invalid = |reason: String| PluginLoadError::InvalidPath {
        path: dir.to_path_buf(),
        reason,
    };

    if !dir.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| invalid(e.to_string()))? {
        let path = entry.map_err(|e| invalid(e.to_string()))?.path();
        if path.is_file() && is_plugin_file(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Remove every `--plugin-path` flag from `args`, returning the directories
pub fn strip_plugin_paths(args: Vec<String>) -> Result<(Vec<PathBuf>, Vec<String>), PluginLoadError> {
    let mut dirs = Vec::new();
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        if arg == PLUGIN_PATH_FLAG {
            let dir = iter.next().ok_or_else(|| PluginLoadError::InvalidPath {
                path: PathBuf::new(),
                reason: format!("{} requires a directory", PLUGIN_PATH_FLAG),
            })?;
            dirs.push(PathBuf::from(dir));
        } else if let Some(dir) = arg
            .strip_prefix(PLUGIN_PATH_FLAG)
            .and_then(|v| v.strip_prefix('='))
        {
            dirs.push(PathBuf::from(dir));
        } else {
            rest.push(arg);
        }
    }

    Ok((dirs, rest))
}

/// Load every plugin named by `--plugin-path` flags in `args`
///
/// Returns the plugins in discovery order and the arguments with the flags
/// removed. Any failure is fatal.
pub fn discover_plugins(
    args: Vec<String>,
    loader: &dyn ModuleLoader,
) -> Result<(Vec<Plugin>, Vec<String>), PluginLoadError> {
    let (dirs, rest) = strip_plugin_paths(args)?;

    let mut plugins = Vec::new();
    for dir in &dirs {
        for path in plugin_files(dir)? {
            let plugin = loader.load(&path)?;
            info!("Loaded plugin `{}` from {}", plugin.name(), path.display());
            plugins.push(plugin);
        }
    }

    Ok((plugins, rest))
}
