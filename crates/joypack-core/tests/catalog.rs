use tempfile::TempDir;

use joypack_core::catalog::{Catalog, CatalogSource};
use joypack_core::orchestration::Installer;
use joypack_core::progress::ProgressBus;
use joypack_core::types::{EnvVarKind, LaunchConfig, LaunchStrategy, Runtime};

mod support;
use support::{FakeRunner, harness};

const CATALOG: &str = r#"{
  "notes": {
    "displayName": "Notes",
    "description": "Local notes server",
    "env": {
      "NOTES_DIR": {"type": "string", "value": "~/Notes"},
      "NOTES_TOKEN": {"type": "password"}
    },
    "localSetup": {
      "repo": "https://github.com/acme/notes-mcp.git",
      "command": "pnpm",
      "entryPoint": "build/index.js",
      "prerequisites": ["vault"]
    }
  },
  "echo": {
    "npxSetup": {"package": "echo-mcp", "args": ["echo-mcp"]},
    "mcpConfig": {"disabledTools": ["shout"]}
  },
  "github": {
    "dockerWrapper": true,
    "dockerImage": "ghcr.io/github/github-mcp-server"
  },
  "memo": {
    "env": {"MEMO_DIR": {"type": "string"}},
    "mcpConfig": {"command": "~/bin/memo-mcp", "args": ["--stdio"]}
  },
  "broken": {
    "description": "declares nothing"
  },
  "ambiguous": {
    "npxSetup": {"package": "x"},
    "dockerWrapper": true,
    "dockerImage": "x/y"
  }
}"#;

#[test]
fn invalid_entries_are_skipped() {
    let catalog = Catalog::parse_str(CATALOG).unwrap();

    let names: Vec<_> = catalog.servers().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["echo", "github", "memo", "notes"]);
}

#[test]
fn entries_map_to_launch_strategies() {
    let catalog = Catalog::parse_str(CATALOG).unwrap();

    let notes = catalog.get("notes").unwrap();
    assert_eq!(notes.title(), "Notes");
    assert_eq!(
        notes.launch_strategy,
        LaunchStrategy::LocalRepo {
            repository_url: "https://github.com/acme/notes-mcp.git".into(),
            runtime: Runtime::Pnpm,
            entry_point: "build/index.js".into(),
        }
    );
    assert_eq!(notes.required_tools(), ["vault", "pnpm"]);
    assert_eq!(
        notes.environment_schema.get("NOTES_TOKEN").unwrap().kind,
        EnvVarKind::Password
    );

    let echo = catalog.get("echo").unwrap();
    assert_eq!(echo.disabled_tools, ["shout"]);
    assert!(matches!(
        catalog.get("github").unwrap().launch_strategy,
        LaunchStrategy::ContainerImage { .. }
    ));
}

#[test]
fn mcp_config_command_alone_is_a_direct_command() {
    let catalog = Catalog::parse_str(CATALOG).unwrap();

    let memo = catalog.get("memo").unwrap();
    assert_eq!(
        memo.launch_strategy,
        LaunchStrategy::DirectCommand {
            command: "~/bin/memo-mcp".into(),
            args: vec!["--stdio".into()],
        }
    );
    assert!(!memo.launch_strategy.uses_wrapper());
    assert!(memo.required_tools().is_empty());
    assert!(memo.environment_schema.get("MEMO_DIR").is_some());
}

#[test]
fn malformed_document_is_an_error() {
    let err = Catalog::parse_str("[1, 2]").unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse server catalog"));
}

#[tokio::test]
async fn file_source_is_read_fresh() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("catalog.json");
    std::fs::write(&path, CATALOG).unwrap();
    let source = CatalogSource::parse(path.to_str().unwrap(), temp.path()).unwrap();

    assert_eq!(Catalog::fetch(&source).await.unwrap().len(), 4);

    std::fs::write(&path, "{}").unwrap();
    assert!(Catalog::fetch(&source).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_file_source_mentions_path() {
    let temp = TempDir::new().unwrap();
    let source = CatalogSource::File(temp.path().join("absent.json"));

    let err = Catalog::fetch(&source).await.unwrap_err();
    assert!(format!("{err:#}").contains("absent.json"));
}

#[test]
fn source_parsing() {
    let home = std::path::Path::new("/home/me");
    assert!(matches!(
        CatalogSource::parse("https://example.com/catalog.json", home).unwrap(),
        CatalogSource::Remote(_)
    ));
    assert_eq!(
        CatalogSource::parse("~/catalog.json", home).unwrap(),
        CatalogSource::File("/home/me/catalog.json".into())
    );
    assert!(CatalogSource::parse("  ", home).is_err());
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn listing_splits_by_registry_state() {
    let h = harness();
    let registry = h.ctx.registry_store();
    registry
        .register("echo", LaunchConfig::for_command("/w/echo.sh"), &h.home)
        .unwrap();
    registry
        .register("retired", LaunchConfig::for_command("/w/retired.sh"), &h.home)
        .unwrap();

    let catalog_path = h.temp.path().join("catalog.json");
    std::fs::write(&catalog_path, CATALOG).unwrap();
    let ctx = h
        .ctx
        .clone()
        .with_catalog(CatalogSource::File(catalog_path));
    let installer = Installer::new(ctx, ProgressBus::new(), FakeRunner::new());

    let listing = installer.list_servers().await.unwrap();

    let installed: Vec<_> = listing.installed.iter().map(|s| s.name.as_str()).collect();
    let available: Vec<_> = listing.available.iter().map(|s| s.name.as_str()).collect();
    let unlisted: Vec<_> = listing.unlisted.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(installed, ["echo"]);
    assert_eq!(available, ["github", "memo", "notes"]);
    assert_eq!(unlisted, ["retired"]);
    assert_eq!(
        listing.installed[0].launch_config.as_ref().unwrap().command,
        "/w/echo.sh"
    );
}
