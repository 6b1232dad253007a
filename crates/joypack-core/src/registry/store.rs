//! Read-modify-write access to the registry file.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::SetupError;
use crate::types::LaunchConfig;

use super::RegistryDocument;

#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current document; a missing file reads as an empty registry.
    pub fn load(&self) -> Result<RegistryDocument, SetupError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(RegistryDocument::default());
            }
            Err(err) => return Err(SetupError::registry_io(&self.path, err)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RegistryDocument::default());
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| SetupError::registry_io(&self.path, io::Error::from(err)))
    }

    pub fn save(&self, document: &RegistryDocument) -> Result<(), SetupError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| SetupError::registry_io(parent, err))?;
        }
        let mut bytes = serde_json::to_vec_pretty(document)
            .map_err(|err| SetupError::registry_io(&self.path, io::Error::from(err)))?;
        bytes.push(b'\n');
        std::fs::write(&self.path, bytes).map_err(|err| SetupError::registry_io(&self.path, err))
    }

    pub fn contains(&self, name: &str) -> Result<bool, SetupError> {
        Ok(self.load()?.contains(name))
    }

    pub fn get(&self, name: &str) -> Result<Option<LaunchConfig>, SetupError> {
        Ok(self.load()?.servers.remove(name))
    }

    /// Insert or replace `name`, expanding `~` against `home`.
    pub fn register(
        &self,
        name: &str,
        config: LaunchConfig,
        home: &Path,
    ) -> Result<LaunchConfig, SetupError> {
        let config = config.with_home(home);
        self.update(|document| {
            document.servers.insert(name.to_string(), config.clone());
            Ok(())
        })?;
        tracing::debug!(server = name, path = %self.path.display(), "Registered server");
        Ok(config)
    }

    /// Remove `name`; returns whether an entry existed.
    pub fn unregister(&self, name: &str) -> Result<bool, SetupError> {
        let mut document = self.load()?;
        if document.servers.remove(name).is_none() {
            return Ok(false);
        }
        self.save(&document)?;
        tracing::debug!(server = name, "Unregistered server");
        Ok(true)
    }

    /// Set the `disabled` flag. Enabling clears the key instead of writing
    /// `false`, so repeated calls leave the same file.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<LaunchConfig, SetupError> {
        self.modify(name, |config| {
            config.disabled = if enabled { None } else { Some(true) };
        })
    }

    /// Flip the `disabled` flag; returns the new enabled state.
    pub fn toggle(&self, name: &str) -> Result<bool, SetupError> {
        let config = self.modify(name, |config| {
            config.disabled = if config.is_enabled() { Some(true) } else { None };
        })?;
        Ok(config.is_enabled())
    }

    pub fn set_disabled_tools(
        &self,
        name: &str,
        tools: Vec<String>,
    ) -> Result<LaunchConfig, SetupError> {
        self.modify(name, move |config| {
            config.disabled_tools = if tools.is_empty() { None } else { Some(tools) };
        })
    }

    fn modify<F>(&self, name: &str, apply: F) -> Result<LaunchConfig, SetupError>
    where
        F: FnOnce(&mut LaunchConfig),
    {
        let mut updated = None;
        self.update(|document| {
            let config = document
                .servers
                .get_mut(name)
                .ok_or_else(|| SetupError::ServerNotInstalled {
                    server: name.to_string(),
                })?;
            apply(config);
            updated = Some(config.clone());
            Ok(())
        })?;
        updated.ok_or_else(|| SetupError::ServerNotInstalled {
            server: name.to_string(),
        })
    }

    fn update<F>(&self, apply: F) -> Result<(), SetupError>
    where
        F: FnOnce(&mut RegistryDocument) -> Result<(), SetupError>,
    {
        let mut document = self.load()?;
        apply(&mut document)?;
        self.save(&document)
    }
}
