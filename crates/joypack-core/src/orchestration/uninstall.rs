//! Removal of an installed server and its artifacts.

use std::path::Path;

use crate::error::SetupError;
use crate::setup::StepReporter;
use crate::types::{LaunchStrategy, ServerDescriptor};

use super::service::Installer;

pub const REGISTRY_REMOVAL_STEP: &str = "MCP Configuration Removal";
pub const ENV_FILE_REMOVAL_STEP: &str = "Environment File Removal";
pub const WRAPPER_REMOVAL_STEP: &str = "Wrapper Removal";
pub const TEARDOWN_STEP: &str = "Repository Teardown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    pub server: String,
    /// Whether the registry had an entry to remove.
    pub registry_entry_removed: bool,
    pub wrapper_removed: bool,
    pub checkout_removed: bool,
}

impl Installer {
    /// Unregister the server, then clean up its files.
    ///
    /// Only the registry update can fail; cleanup problems are logged and
    /// the remaining steps still run.
    pub async fn uninstall(
        &self,
        descriptor: &ServerDescriptor,
    ) -> Result<UninstallReport, SetupError> {
        let server = descriptor.name.as_str();
        let _guard = self.locks.acquire(server).await;
        let reporter = StepReporter::new(&self.bus, server);

        let local_repo = match &descriptor.launch_strategy {
            LaunchStrategy::LocalRepo { repository_url, .. } => Some(repository_url.as_str()),
            _ => None,
        };
        reporter.pending(REGISTRY_REMOVAL_STEP);
        reporter.pending(ENV_FILE_REMOVAL_STEP);
        if local_repo.is_some() {
            reporter.pending(TEARDOWN_STEP);
        } else if descriptor.launch_strategy.uses_wrapper() {
            reporter.pending(WRAPPER_REMOVAL_STEP);
        }

        let registry_entry_removed = reporter
            .track(REGISTRY_REMOVAL_STEP, "Removing MCP configuration", async {
                self.ctx.registry_store().unregister(server)
            })
            .await?;

        reporter.start(ENV_FILE_REMOVAL_STEP, "Removing environment file");
        self.ctx.env_file_store().remove(server);
        reporter.complete(ENV_FILE_REMOVAL_STEP, "Environment file removed");

        let mut report = UninstallReport {
            server: server.to_string(),
            registry_entry_removed,
            wrapper_removed: false,
            checkout_removed: false,
        };

        match local_repo {
            Some(url) => {
                reporter.start(TEARDOWN_STEP, "Removing repository checkout");
                let checkout = self.provisioner.checkout_path(url);
                self.provisioner.teardown(url).await;
                report.checkout_removed = !checkout.exists();
                reporter.complete(TEARDOWN_STEP, "Repository removed");
            }
            None => {
                let wrapper = self.ctx.wrapper_generator().script_path(
                    server,
                    &descriptor.launch_strategy,
                    None,
                );
                if let Some(wrapper) = wrapper {
                    reporter.start(WRAPPER_REMOVAL_STEP, "Removing wrapper script");
                    report.wrapper_removed = remove_path_if_exists(&wrapper);
                    reporter.complete(WRAPPER_REMOVAL_STEP, "Wrapper removed");
                }
            }
        }

        tracing::info!(server, registered = registry_entry_removed, "Uninstalled server");
        Ok(report)
    }

    /// Remove a registry entry the catalog no longer describes, along with
    /// its environment file. Returns whether an entry existed.
    pub async fn uninstall_unlisted(&self, name: &str) -> Result<bool, SetupError> {
        let _guard = self.locks.acquire(name).await;
        let removed = self.ctx.registry_store().unregister(name)?;
        self.ctx.env_file_store().remove(name);
        tracing::info!(server = name, removed, "Removed unlisted server");
        Ok(removed)
    }
}

/// Remove a file or directory tree, logging failures. Returns whether
/// something was removed.
pub fn remove_path_if_exists(path: &Path) -> bool {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return false,
        Err(err) => {
            tracing::warn!(path = %path.display(), "Failed to read metadata: {}", err);
            return false;
        }
    };
    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(path = %path.display(), "Failed to remove: {}", err);
            false
        }
    }
}
