// Plugin module - Command groups contributed by dynamic libraries

mod loader;

pub use loader::{
    discover_plugins, is_plugin_file, plugin_files, strip_plugin_paths, DylibLoader, ModuleLoader,
    Plugin, PluginDeclaration, PluginLoadError, PLUGIN_ABI_VERSION, PLUGIN_DECLARATION_SYMBOL,
    PLUGIN_FILE_SUFFIX, PLUGIN_PATH_FLAG,
};
