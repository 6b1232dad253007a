//! The [`Installer`]: entry point for every operation on a server.

use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::{Catalog, ServerListing};
use crate::context::AppContext;
use crate::error::SetupError;
use crate::process::CommandRunner;
use crate::progress::ProgressBus;
use crate::setup::{BuildOverrides, BuildRoutine, GitProvisioner, PrerequisiteChecker, Provisioner};
use crate::types::{EnvValues, LaunchConfig, ServerDescriptor};

use super::locks::ServerLocks;

/// Installs, configures, and removes servers.
///
/// Cloning is cheap; clones share the progress bus and the per-server locks,
/// so two clones never run overlapping operations on the same server.
#[derive(Debug, Clone)]
pub struct Installer {
    pub(super) ctx: AppContext,
    pub(super) bus: ProgressBus,
    pub(super) runner: Arc<dyn CommandRunner>,
    pub(super) provisioner: Arc<dyn Provisioner>,
    pub(super) build_overrides: BuildOverrides,
    pub(super) locks: ServerLocks,
}

impl Installer {
    pub fn new(ctx: AppContext, bus: ProgressBus, runner: Arc<dyn CommandRunner>) -> Self {
        let provisioner = Arc::new(GitProvisioner::new(
            ctx.repos_dir().to_path_buf(),
            Arc::clone(&runner),
        ));
        let build_overrides = BuildOverrides::from_config(ctx.build_overrides());
        Self {
            ctx,
            bus,
            runner,
            provisioner,
            build_overrides,
            locks: ServerLocks::new(),
        }
    }

    pub fn with_provisioner(mut self, provisioner: Arc<dyn Provisioner>) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn with_build_override(
        mut self,
        server: impl Into<String>,
        routine: Arc<dyn BuildRoutine>,
    ) -> Self {
        self.build_overrides.insert(server, routine);
        self
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn bus(&self) -> &ProgressBus {
        &self.bus
    }

    pub(super) fn prerequisite_checker(&self) -> PrerequisiteChecker {
        PrerequisiteChecker::new(Arc::clone(&self.runner), self.ctx.package_installer())
    }

    /// Fetch the catalog and split it by registry state.
    pub async fn list_servers(&self) -> anyhow::Result<ServerListing> {
        let catalog = Catalog::fetch(self.ctx.catalog()).await?;
        Ok(self.list_from(&catalog)?)
    }

    /// Merge an already loaded catalog with the registry.
    pub fn list_from(&self, catalog: &Catalog) -> Result<ServerListing, SetupError> {
        let registry = self.ctx.registry_store().load()?;
        Ok(catalog.merge(&registry))
    }

    /// Whether the registry has an entry for `name`.
    pub fn is_installed(&self, name: &str) -> Result<bool, SetupError> {
        self.ctx.registry_store().contains(name)
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<LaunchConfig, SetupError> {
        let _guard = self.locks.acquire(name).await;
        let config = self.ctx.registry_store().set_enabled(name, enabled)?;
        tracing::info!(server = name, enabled, "Updated server state");
        Ok(config)
    }

    /// Flip the enabled flag; returns the new state.
    pub async fn toggle(&self, name: &str) -> Result<bool, SetupError> {
        let _guard = self.locks.acquire(name).await;
        let enabled = self.ctx.registry_store().toggle(name)?;
        tracing::info!(server = name, enabled, "Toggled server");
        Ok(enabled)
    }

    pub async fn set_disabled_tools(
        &self,
        name: &str,
        tools: Vec<String>,
    ) -> Result<LaunchConfig, SetupError> {
        let _guard = self.locks.acquire(name).await;
        self.ctx.registry_store().set_disabled_tools(name, tools)
    }

    /// Rewrite the environment file of an installed server. The wrapper reads
    /// the file at launch, so nothing else changes.
    pub async fn configure(
        &self,
        descriptor: &ServerDescriptor,
        values: &EnvValues,
    ) -> Result<PathBuf, SetupError> {
        let _guard = self.locks.acquire(&descriptor.name).await;
        if !self.is_installed(&descriptor.name)? {
            return Err(SetupError::ServerNotInstalled {
                server: descriptor.name.clone(),
            });
        }
        let path = self
            .ctx
            .env_file_store()
            .write(&descriptor.name, &descriptor.environment_values(values))?;
        tracing::info!(server = %descriptor.name, "Updated environment");
        Ok(path)
    }

    /// Values saved for `descriptor`, or `None` if it was never configured.
    pub fn read_saved_environment(&self, descriptor: &ServerDescriptor) -> Option<EnvValues> {
        self.ctx
            .env_file_store()
            .read(&descriptor.name, &descriptor.environment_schema)
    }
}
