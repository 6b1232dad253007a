//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::catalog::CatalogSource;
use crate::config::{BuildOverrideEntry, ConfigStore, JoypackConfig, expand_home};
use crate::env_file::EnvFileStore;
use crate::registry::RegistryStore;
use crate::setup::WrapperGenerator;

/// Resolved locations and settings shared by every operation.
///
/// Frontends create this once (usually through [`AppContext::load`]) and
/// hand it to the [`Installer`](crate::orchestration::Installer).
#[derive(Debug, Clone)]
pub struct AppContext {
    home_dir: PathBuf,
    registry_path: PathBuf,
    env_dir: PathBuf,
    repos_dir: PathBuf,
    catalog: CatalogSource,
    package_installer: String,
    package_client: String,
    build_overrides: Vec<BuildOverrideEntry>,
}

impl AppContext {
    /// Resolve `config` against `home_dir`.
    pub fn new(home_dir: PathBuf, config: &JoypackConfig) -> anyhow::Result<Self> {
        let catalog = CatalogSource::parse(&config.catalog, &home_dir)
            .with_context(|| format!("Invalid catalog location: {}", config.catalog))?;

        Ok(Self {
            registry_path: expand_home(&config.registry_path, &home_dir),
            env_dir: expand_home(&config.env_dir, &home_dir),
            repos_dir: expand_home(&config.repos_dir, &home_dir),
            catalog,
            package_installer: config.package_installer.clone(),
            package_client: config.package_client.clone(),
            build_overrides: config.build_overrides.clone(),
            home_dir,
        })
    }

    /// Context with default settings rooted at `home_dir` (for testing).
    pub fn for_home(home_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::new(home_dir.into(), &JoypackConfig::default())
    }

    /// Context from the user's home directory and `joypack.toml`.
    pub fn load() -> anyhow::Result<Self> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        let config = ConfigStore::from_env()?.load()?;
        Self::new(home, &config)
    }

    pub fn with_catalog(mut self, catalog: CatalogSource) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    pub fn env_dir(&self) -> &Path {
        &self.env_dir
    }

    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    pub fn catalog(&self) -> &CatalogSource {
        &self.catalog
    }

    pub fn package_installer(&self) -> &str {
        &self.package_installer
    }

    pub fn package_client(&self) -> &str {
        &self.package_client
    }

    pub fn build_overrides(&self) -> &[BuildOverrideEntry] {
        &self.build_overrides
    }

    /// Get an EnvFileStore rooted at the environment directory.
    pub fn env_file_store(&self) -> EnvFileStore {
        EnvFileStore::new(self.env_dir.clone(), self.home_dir.clone())
    }

    /// Get a RegistryStore for the MCP registry file.
    pub fn registry_store(&self) -> RegistryStore {
        RegistryStore::new(self.registry_path.clone())
    }

    /// Get a WrapperGenerator.
    pub fn wrapper_generator(&self) -> WrapperGenerator {
        WrapperGenerator::new(self.env_dir.clone(), self.repos_dir.clone())
    }
}
