// Native Plugin Tests
// Real plugin libraries built from small crates against this one, then
// loaded through DylibLoader

use smpmgr::cli::build_command;
use smpmgr::commands::{CommandRegistry, Session};
use smpmgr::config::GlobalArgs;
use smpmgr::plugin::{discover_plugins, DylibLoader, ModuleLoader, PluginLoadError};
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tempfile::TempDir;

const MANIFEST: &str = r#"[package]
name = "echo_group"
version = "0.1.0"
edition = "2021"

[lib]
crate-type = ["cdylib"]
path = "lib.rs"

[dependencies]
async-trait = "0.1"
clap = "4"
smpmgr = { path = "@HOST@" }

[workspace]
"#;

const ECHO_PLUGIN: &str = r#"
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use smpmgr::commands::{CommandError, CommandGroup, Session};

struct EchoGroup;

#[async_trait]
impl CommandGroup for EchoGroup {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn command(&self) -> Command {
        Command::new("echo").about("Echo group from a plugin")
    }

    async fn run(&self, _session: &mut Session, _matches: &ArgMatches) -> Result<(), CommandError> {
        Ok(())
    }
}

smpmgr::export_plugin!(|| Box::new(EchoGroup));
"#;

const NO_DECLARATION: &str = r#"
#[no_mangle]
pub extern "C" fn echo_group_version() -> u32 {
    1
}
"#;

const STALE_DECLARATION: &str = r#"
use smpmgr::commands::CommandGroup;
use smpmgr::plugin::{PluginDeclaration, PLUGIN_ABI_VERSION};

fn register() -> Box<dyn CommandGroup> {
    panic!("a rejected plugin must not be registered")
}

#[no_mangle]
#[allow(non_upper_case_globals)]
pub static smpmgr_plugin_declaration: PluginDeclaration = PluginDeclaration {
    abi_version: PLUGIN_ABI_VERSION + @ABI_SKEW@,
    core_version: @CORE_VERSION@,
    register,
};
"#;

#[derive(Debug, Clone, Copy)]
enum Fixture {
    Echo,
    NoDeclaration,
    StaleAbi,
    OtherCore,
}

impl Fixture {
    const ALL: [Fixture; 4] = [Self::Echo, Self::NoDeclaration, Self::StaleAbi, Self::OtherCore];

    fn dir_name(self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::NoDeclaration => "no_declaration",
            Self::StaleAbi => "stale_abi",
            Self::OtherCore => "other_core",
        }
    }

    fn source(self) -> String {
        match self {
            Self::Echo => ECHO_PLUGIN.to_string(),
            Self::NoDeclaration => NO_DECLARATION.to_string(),
            Self::StaleAbi => STALE_DECLARATION
                .replace("@ABI_SKEW@", "1")
                .replace("@CORE_VERSION@", "smpmgr::VERSION"),
            Self::OtherCore => STALE_DECLARATION
                .replace("@ABI_SKEW@", "0")
                .replace("@CORE_VERSION@", "\"0.0.0-other\""),
        }
    }
}

fn library_name() -> String {
    format!("{}echo_group{}", DLL_PREFIX, DLL_SUFFIX)
}

fn build_fixture(root: &Path, fixture: Fixture) -> Result<PathBuf, String> {
    let host = env!("CARGO_MANIFEST_DIR");
    let crate_dir = root.join(fixture.dir_name());
    std::fs::create_dir_all(&crate_dir).map_err(|e| e.to_string())?;
    std::fs::write(crate_dir.join("Cargo.toml"), MANIFEST.replace("@HOST@", host)).map_err(|e| e.to_string())?;
    std::fs::write(crate_dir.join("lib.rs"), fixture.source()).map_err(|e| e.to_string())?;
    // Pin the fixture to the versions the host already resolved
    let lock = Path::new(host).join("Cargo.lock");
    if lock.exists() {
        std::fs::copy(&lock, crate_dir.join("Cargo.lock")).map_err(|e| e.to_string())?;
    }

    let target_dir = root.join("target");
    let output = Command::new(env!("CARGO"))
        .arg("build")
        .arg("--quiet")
        .arg("--manifest-path")
        .arg(crate_dir.join("Cargo.toml"))
        .arg("--target-dir")
        .arg(&target_dir)
        .output()
        .map_err(|e| e.to_string())?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).into_owned());
    }

    let built = target_dir.join("debug").join(library_name());
    let kept = root.join("libs").join(fixture.dir_name());
    std::fs::create_dir_all(&kept).map_err(|e| e.to_string())?;
    let kept = kept.join(library_name());
    std::fs::copy(&built, &kept).map_err(|e| e.to_string())?;
    Ok(kept)
}

/// Build every fixture once; builds share one target directory
fn fixtures() -> &'static Result<Vec<PathBuf>, String> {
    static FIXTURES: OnceLock<Result<Vec<PathBuf>, String>> = OnceLock::new();
    FIXTURES.get_or_init(|| {
        let root = Path::new(env!("CARGO_TARGET_TMPDIR")).join("plugin-fixtures");
        Fixture::ALL.iter().map(|f| build_fixture(&root, *f)).collect()
    })
}

/// A fresh plugin directory holding one copy of `fixture`
fn plugin_dir(fixture: Fixture) -> (TempDir, PathBuf) {
    let libs = fixtures().as_ref().unwrap_or_else(|e| panic!("fixture build failed:\n{}", e));
    let index = Fixture::ALL.iter().position(|f| f.dir_name() == fixture.dir_name()).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(library_name());
    std::fs::copy(&libs[index], &path).unwrap();
    (dir, path)
}

// ============================================================================
// LOADING
// ============================================================================

#[test]
fn test_dylib_loader_registers_exported_group() {
    let (_dir, path) = plugin_dir(Fixture::Echo);

    let plugin = DylibLoader.load(&path).unwrap();

    assert_eq!(plugin.name(), "echo");
    assert_eq!(plugin.source_path(), path.as_path());
    assert_eq!(plugin.group().command().get_name(), "echo");
}

#[test]
fn test_library_without_declaration_is_rejected() {
    let (_dir, path) = plugin_dir(Fixture::NoDeclaration);

    let err = DylibLoader.load(&path).unwrap_err();

    assert!(matches!(err, PluginLoadError::MissingDeclaration { .. }));
    assert_eq!(err.path(), path.as_path());
}

#[test]
fn test_mismatched_abi_is_rejected() {
    let (_dir, path) = plugin_dir(Fixture::StaleAbi);

    let err = DylibLoader.load(&path).unwrap_err();

    match err {
        PluginLoadError::InvalidDeclaration { reason, .. } => assert!(reason.contains("ABI version")),
        other => panic!("expected InvalidDeclaration, got {:?}", other),
    }
}

#[test]
fn test_mismatched_core_version_is_rejected() {
    let (_dir, path) = plugin_dir(Fixture::OtherCore);

    let err = DylibLoader.load(&path).unwrap_err();

    match err {
        PluginLoadError::InvalidDeclaration { reason, .. } => assert!(reason.contains("0.0.0-other")),
        other => panic!("expected InvalidDeclaration, got {:?}", other),
    }
}

// ============================================================================
// DISCOVERY TO DISPATCH
// ============================================================================

#[tokio::test]
async fn test_discovered_plugin_runs_from_command_line() {
    let (dir, _path) = plugin_dir(Fixture::Echo);
    std::fs::write(dir.path().join("bar.py"), "print('not a plugin')").unwrap();
    let dir_arg = dir.path().to_string_lossy().into_owned();
    let args: Vec<String> = vec!["smpmgr".into(), "--plugin-path".into(), dir_arg, "echo".into()];

    let (plugins, rest) = discover_plugins(args, &DylibLoader).unwrap();

    assert_eq!(plugins.iter().map(|p| p.name()).collect::<Vec<_>>(), vec!["echo"]);
    assert_eq!(rest, vec!["smpmgr", "echo"]);

    let mut registry = CommandRegistry::with_builtin_groups();
    assert!(registry.register_plugins(plugins).is_empty());
    let matches = build_command(&registry).try_get_matches_from(rest).unwrap();
    let mut session = Session::quiet(GlobalArgs::default());

    registry.dispatch(&mut session, &matches).await.unwrap();
}
