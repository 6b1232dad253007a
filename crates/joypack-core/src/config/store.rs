//! Config store for loading and saving joypack.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{JoypackConfig, parser, paths};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store at the platform config location.
    pub fn from_env() -> anyhow::Result<Self> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        let config_dir = dirs::config_dir();
        Ok(Self::from_path(paths::config_path(config_dir.as_deref(), &home)))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> anyhow::Result<JoypackConfig> {
        if !self.config_path.exists() {
            return Ok(JoypackConfig::new());
        }
        parser::parse_joypack_toml(&self.config_path)
    }

    pub fn save(&self, config: &JoypackConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
