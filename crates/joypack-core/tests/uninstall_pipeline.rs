use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use joypack_core::error::SetupError;
use joypack_core::orchestration::{
    ENV_FILE_REMOVAL_STEP, REGISTRY_REMOVAL_STEP, WRAPPER_REMOVAL_STEP,
};
use joypack_core::progress::StepStatus;
use joypack_core::registry::RegistryStore;
use joypack_core::setup::Provisioner;
use joypack_core::types::{EnvValues, LaunchConfig, LaunchStrategy, Runtime, ServerDescriptor};

mod support;
use support::{echo_server, harness, local_server};

/// Provisioner that records whether the registry still listed the server
/// when teardown ran.
#[derive(Debug)]
struct RecordingProvisioner {
    repos_dir: PathBuf,
    registry: RegistryStore,
    registered_at_teardown: Mutex<Vec<bool>>,
}

#[async_trait]
impl Provisioner for RecordingProvisioner {
    fn checkout_path(&self, _url: &str) -> PathBuf {
        self.repos_dir.join("checkout")
    }

    async fn clone_repository(&self, url: &str) -> Result<PathBuf, SetupError> {
        let path = self.checkout_path(url);
        std::fs::create_dir_all(&path).unwrap();
        Ok(path)
    }

    async fn teardown(&self, url: &str) {
        let registered = self.registry.contains("notes").unwrap();
        self.registered_at_teardown.lock().unwrap().push(registered);
        std::fs::remove_dir_all(self.checkout_path(url)).unwrap();
    }
}

#[tokio::test]
async fn registry_entry_is_removed_before_teardown() {
    let h = harness();
    let provisioner = Arc::new(RecordingProvisioner {
        repos_dir: h.repos_dir(),
        registry: h.ctx.registry_store(),
        registered_at_teardown: Mutex::new(Vec::new()),
    });
    let installer = h.installer().with_provisioner(provisioner.clone());
    let descriptor = local_server("notes", Runtime::Node);

    installer.install(&descriptor, &EnvValues::new()).await.unwrap();
    assert!(installer.is_installed("notes").unwrap());

    let report = installer.uninstall(&descriptor).await.unwrap();

    assert_eq!(*provisioner.registered_at_teardown.lock().unwrap(), [false]);
    assert!(report.registry_entry_removed);
    assert!(report.checkout_removed);
    assert!(!h.repos_dir().join("checkout").exists());
    assert!(!h.env_dir().join("notes.env").exists());
}

#[tokio::test]
async fn failed_checkout_removal_still_unregisters() {
    let h = harness();
    let installer = h.installer();
    let descriptor = local_server("notes", Runtime::Node);
    installer.install(&descriptor, &EnvValues::new()).await.unwrap();

    // A regular file where the checkout directory should be makes
    // directory removal fail regardless of permissions.
    let checkout = h.repos_dir().join("notes-mcp");
    std::fs::remove_dir_all(&checkout).unwrap();
    std::fs::write(&checkout, "not a directory").unwrap();

    let report = installer.uninstall(&descriptor).await.unwrap();

    assert!(report.registry_entry_removed);
    assert!(!report.checkout_removed);
    assert!(!installer.is_installed("notes").unwrap());
    assert!(checkout.is_file());
    assert!(!h.env_dir().join("notes.env").exists());
}

#[tokio::test]
async fn package_uninstall_removes_wrapper_and_env() {
    let h = harness();
    let (steps, _sub) = h.record_steps();
    let installer = h.installer();
    installer
        .install(&echo_server(), &EnvValues::new())
        .await
        .unwrap();
    let wrapper = h.env_dir().join("echo-server-npx-wrapper.sh");
    assert!(wrapper.exists());

    let report = installer.uninstall(&echo_server()).await.unwrap();

    assert!(report.wrapper_removed);
    assert!(!wrapper.exists());
    assert!(!h.env_dir().join("echo-server.env").exists());
    assert!(h.registry_json()["mcpServers"].get("echo-server").is_none());

    let steps = steps.lock().unwrap();
    let position = |step: &str, status: StepStatus| {
        steps
            .iter()
            .position(|s| s.step == step && s.status == status)
            .unwrap()
    };
    let registry_done = position(REGISTRY_REMOVAL_STEP, StepStatus::Complete);
    let env_started = position(ENV_FILE_REMOVAL_STEP, StepStatus::InProgress);
    assert!(registry_done < env_started);
}

#[tokio::test]
async fn direct_command_uninstall_has_no_wrapper_step() {
    let h = harness();
    let (steps, _sub) = h.record_steps();
    let installer = h.installer();
    let descriptor = ServerDescriptor::new(
        "notes",
        LaunchStrategy::DirectCommand {
            command: "/opt/notes-mcp".into(),
            args: Vec::new(),
        },
    );
    installer.install(&descriptor, &EnvValues::new()).await.unwrap();

    let report = installer.uninstall(&descriptor).await.unwrap();

    assert!(report.registry_entry_removed);
    assert!(!report.wrapper_removed);
    assert!(!installer.is_installed("notes").unwrap());
    let steps = steps.lock().unwrap();
    assert!(steps.iter().all(|s| s.step != WRAPPER_REMOVAL_STEP));
}

#[tokio::test]
async fn uninstall_of_unregistered_server_still_cleans_up() {
    let h = harness();
    std::fs::create_dir_all(h.env_dir()).unwrap();
    std::fs::write(h.env_dir().join("echo-server.env"), "A=1\n").unwrap();

    let report = h.installer().uninstall(&echo_server()).await.unwrap();

    assert!(!report.registry_entry_removed);
    assert!(!report.wrapper_removed);
    assert!(!h.env_dir().join("echo-server.env").exists());
}

#[tokio::test]
async fn unlisted_entry_can_be_removed() {
    let h = harness();
    h.ctx
        .registry_store()
        .register("legacy", LaunchConfig::for_command("/opt/legacy"), &h.home)
        .unwrap();

    let installer = h.installer();
    assert!(installer.uninstall_unlisted("legacy").await.unwrap());
    assert!(!installer.uninstall_unlisted("legacy").await.unwrap());
    assert!(!installer.is_installed("legacy").unwrap());
}

// =============================================================================
// Registry-only operations
// =============================================================================

#[tokio::test]
async fn configure_requires_installed_server() {
    let h = harness();
    let installer = h.installer();

    let err = installer
        .configure(&echo_server(), &EnvValues::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ServerNotInstalled");

    let err = installer.set_enabled("echo-server", false).await.unwrap_err();
    assert!(matches!(err, SetupError::ServerNotInstalled { .. }));
}

#[tokio::test]
async fn configure_rewrites_env_without_touching_wrapper() {
    let h = harness();
    let installer = h.installer();
    let descriptor = echo_server()
        .with_env_var("API_KEY", Default::default());
    installer
        .install(&descriptor, &[("API_KEY", "old")].into_iter().collect())
        .await
        .unwrap();
    let wrapper = h.env_dir().join("echo-server-npx-wrapper.sh");
    let before = std::fs::read_to_string(&wrapper).unwrap();
    let calls_before = h.runner.calls().len();

    installer
        .configure(&descriptor, &[("API_KEY", "new")].into_iter().collect())
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&wrapper).unwrap(), before);
    assert_eq!(h.runner.calls().len(), calls_before);
    let saved = installer.read_saved_environment(&descriptor).unwrap();
    assert_eq!(saved.get("API_KEY"), Some("new"));
}

#[tokio::test]
async fn toggle_and_enable_round_trip() {
    let h = harness();
    let installer = h.installer();
    installer
        .install(&echo_server(), &EnvValues::new())
        .await
        .unwrap();

    assert!(!installer.toggle("echo-server").await.unwrap());
    assert_eq!(h.registry_json()["mcpServers"]["echo-server"]["disabled"], true);

    let config = installer.set_enabled("echo-server", true).await.unwrap();
    assert!(config.is_enabled());
    assert!(h.registry_json()["mcpServers"]["echo-server"].get("disabled").is_none());
}
