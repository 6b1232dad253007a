use std::path::Path;

use tempfile::TempDir;

use joypack_core::error::SetupError;
use joypack_core::registry::RegistryStore;
use joypack_core::types::LaunchConfig;

fn setup() -> (TempDir, RegistryStore) {
    let temp = TempDir::new().unwrap();
    let store = RegistryStore::new(temp.path().join(".codeium/windsurf/mcp_config.json"));
    (temp, store)
}

fn register(store: &RegistryStore, home: &Path, name: &str) {
    store
        .register(name, LaunchConfig::for_command(format!("/w/{name}.sh")), home)
        .unwrap();
}

#[test]
fn missing_file_is_empty_registry() {
    let (_temp, store) = setup();
    assert!(store.load().unwrap().servers.is_empty());
    assert!(!store.contains("echo").unwrap());
    assert!(!store.path().exists());
}

#[test]
fn installed_iff_key_present() {
    let (temp, store) = setup();
    register(&store, temp.path(), "echo");

    assert!(store.contains("echo").unwrap());
    assert!(!store.contains("other").unwrap());

    assert!(store.unregister("echo").unwrap());
    assert!(!store.contains("echo").unwrap());
    assert!(!store.unregister("echo").unwrap());
}

#[test]
fn set_enabled_twice_equals_once() {
    let (temp, store) = setup();
    register(&store, temp.path(), "echo");

    store.set_enabled("echo", false).unwrap();
    let once = std::fs::read(store.path()).unwrap();
    store.set_enabled("echo", false).unwrap();
    assert_eq!(std::fs::read(store.path()).unwrap(), once);

    store.set_enabled("echo", true).unwrap();
    let once = std::fs::read(store.path()).unwrap();
    let config = store.set_enabled("echo", true).unwrap();
    assert_eq!(std::fs::read(store.path()).unwrap(), once);
    assert!(config.is_enabled());
}

#[test]
fn set_enabled_on_unknown_server_fails() {
    let (_temp, store) = setup();
    let err = store.set_enabled("ghost", true).unwrap_err();
    assert!(matches!(err, SetupError::ServerNotInstalled { ref server } if server == "ghost"));
    assert!(!store.path().exists());
}

#[test]
fn toggle_flips_disabled_flag() {
    let (temp, store) = setup();
    register(&store, temp.path(), "echo");

    assert!(!store.toggle("echo").unwrap());
    assert_eq!(store.load().unwrap().servers["echo"].disabled, Some(true));
    assert!(store.toggle("echo").unwrap());
    assert_eq!(store.load().unwrap().servers["echo"].disabled, None);
}

#[test]
fn unknown_keys_survive_rewrites() {
    let (temp, store) = setup();
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(
        store.path(),
        r#"{
  "theme": "dark",
  "mcpServers": {
    "manual": {"command": "/usr/bin/manual", "env": {"X": "1"}, "serverUrl": "http://localhost"}
  }
}"#,
    )
    .unwrap();

    register(&store, temp.path(), "echo");
    store.set_enabled("manual", false).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(value["theme"], "dark");
    assert_eq!(value["mcpServers"]["manual"]["env"]["X"], "1");
    assert_eq!(value["mcpServers"]["manual"]["serverUrl"], "http://localhost");
    assert_eq!(value["mcpServers"]["manual"]["disabled"], true);
    assert_eq!(value["mcpServers"]["echo"]["command"], "/w/echo.sh");
}

#[test]
fn register_expands_tilde() {
    let (temp, store) = setup();
    let config = LaunchConfig {
        args: Some(vec!["~/data".into()]),
        ..LaunchConfig::for_command("~/.mcp/echo-npx-wrapper.sh")
    };

    let stored = store.register("echo", config, Path::new("/home/me")).unwrap();

    assert_eq!(stored.command, "/home/me/.mcp/echo-npx-wrapper.sh");
    assert_eq!(stored.args.as_deref().unwrap(), ["/home/me/data"]);
    drop(temp);
}

#[test]
fn tilde_inside_path_is_kept() {
    let (temp, store) = setup();
    let wrapper = temp.path().join("a~b/.mcp/echo-npx-wrapper.sh");
    let command = wrapper.to_string_lossy().into_owned();

    store
        .register("echo", LaunchConfig::for_command(command.clone()), temp.path())
        .unwrap();

    assert_eq!(store.get("echo").unwrap().unwrap().command, command);
}
