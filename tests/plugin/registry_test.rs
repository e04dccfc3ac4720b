// Plugin Registration Tests
// Later registrations replace earlier groups of the same name

use crate::common::{StubGroup, StubLoader};
use smpmgr::commands::{CommandRegistry, Session};
use smpmgr::config::GlobalArgs;
use smpmgr::plugin::{ModuleLoader, Plugin};
use std::path::Path;
use std::sync::Arc;

fn plugin(file: &str) -> Plugin {
    StubLoader::default().load(Path::new(file)).unwrap()
}

#[test]
fn test_builtin_groups_registered() {
    let registry = CommandRegistry::with_builtin_groups();

    assert_eq!(
        registry.names(),
        vec!["os", "image", "file", "statistics", "enum", "exec", "terminal", "upgrade"]
    );
}

#[test]
fn test_plugin_adds_new_group() {
    let mut registry = CommandRegistry::with_builtin_groups();
    let before = registry.len();

    let shadowed = registry.register_plugins(vec![plugin("/p/mcumgr_group.so")]);

    assert!(shadowed.is_empty());
    assert_eq!(registry.len(), before + 1);
    assert!(registry.get("mcumgr").is_some());
}

#[test]
fn test_plugin_shadows_builtin() {
    let mut registry = CommandRegistry::with_builtin_groups();
    let before = registry.len();

    let shadowed = registry.register_plugins(vec![plugin("/p/os_group.so")]);

    assert_eq!(shadowed, vec!["os"]);
    assert_eq!(registry.len(), before);
    let root = registry.augment(clap::Command::new("smpmgr"));
    let os = root.find_subcommand("os").unwrap();
    assert_eq!(os.get_about().map(|a| a.to_string()), Some("plugin:os_group".to_string()));
}

#[test]
fn test_last_plugin_wins() {
    let mut registry = CommandRegistry::new();

    let shadowed = registry.register_plugins(vec![
        plugin("/a/dup_group.so"),
        plugin("/b/libdup_group.so"),
    ]);

    assert_eq!(shadowed, vec!["dup"]);
    assert_eq!(registry.names(), vec!["dup"]);
    let root = registry.augment(clap::Command::new("smpmgr"));
    let dup = root.find_subcommand("dup").unwrap();
    assert_eq!(dup.get_about().map(|a| a.to_string()), Some("plugin:libdup_group".to_string()));
}

#[test]
fn test_reserved_names_are_ignored() {
    let mut registry = CommandRegistry::new();

    assert!(registry.register(Arc::new(StubGroup::new("shell"))).is_none());
    assert!(registry.register(Arc::new(StubGroup::new("help"))).is_none());

    assert!(registry.is_empty());
}

#[test]
fn test_register_returns_replaced_group() {
    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(StubGroup::tagged("x", "first")));

    let replaced = registry.register(Arc::new(StubGroup::tagged("x", "second"))).unwrap();

    assert_eq!(replaced.command().get_about().map(|a| a.to_string()), Some("first".to_string()));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_dispatch_reaches_replacing_group() {
    let first = StubGroup::tagged("x", "first");
    let second = StubGroup::tagged("x", "second");
    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(first.clone()));
    registry.register(Arc::new(second.clone()));

    let matches = registry
        .augment(clap::Command::new("smpmgr"))
        .try_get_matches_from(["smpmgr", "x", "ping", "hello"])
        .unwrap();
    let mut session = Session::quiet(GlobalArgs::default());
    registry.dispatch(&mut session, &matches).await.unwrap();

    assert!(first.runs().is_empty());
    assert_eq!(second.runs(), vec!["second:ping hello"]);
}
