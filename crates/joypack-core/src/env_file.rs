//! Per-server environment files (`<env_dir>/<server>.env`).
//!
//! The format is plain `KEY=VALUE` lines without quoting or escaping. Values
//! containing `=` survive a round trip (only the first `=` splits); values
//! containing newlines do not.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::SetupError;
use crate::types::{EnvSchema, EnvValues};

#[derive(Debug, Clone)]
pub struct EnvFileStore {
    env_dir: PathBuf,
    home_dir: PathBuf,
}

impl EnvFileStore {
    pub fn new(env_dir: PathBuf, home_dir: PathBuf) -> Self {
        Self { env_dir, home_dir }
    }

    pub fn env_dir(&self) -> &Path {
        &self.env_dir
    }

    pub fn path_for(&self, server: &str) -> PathBuf {
        self.env_dir.join(format!("{server}.env"))
    }

    /// Write `values` in order, replacing every `~` with the home directory.
    ///
    /// The file is always written, so an empty set of values still produces
    /// an (empty) file the wrapper script can source.
    pub fn write(&self, server: &str, values: &EnvValues) -> Result<PathBuf, SetupError> {
        let path = self.path_for(server);
        let home = self.home_dir.to_string_lossy();

        let mut content = String::new();
        for (key, value) in values.iter() {
            let _ = writeln!(content, "{}={}", key, value.replace('~', &home));
        }

        std::fs::create_dir_all(&self.env_dir).map_err(|source| SetupError::EnvFileIo {
            path: self.env_dir.clone(),
            source,
        })?;
        std::fs::write(&path, content).map_err(|source| SetupError::EnvFileIo {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(
            server,
            path = %path.display(),
            keys = values.len(),
            "Wrote environment file"
        );
        Ok(path)
    }

    /// Saved values for the keys in `schema`, or `None` when no readable file
    /// exists. Keys missing from the file keep the schema default.
    pub fn read(&self, server: &str, schema: &EnvSchema) -> Option<EnvValues> {
        let path = self.path_for(server);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), "Environment file unreadable: {}", err);
                }
                return None;
            }
        };

        let mut values = schema.default_values();
        for line in content.lines().filter(|line| !line.trim().is_empty()) {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if schema.contains(key) {
                values.insert(key, value);
            }
        }
        Some(values)
    }

    /// Delete the file; absence is not an error and failures are only logged.
    pub fn remove(&self, server: &str) {
        let path = self.path_for(server);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed environment file"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), "Failed to remove environment file: {}", err)
            }
        }
    }
}
