//! Schema for joypack.toml.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CATALOG: &str = "https://gist.githubusercontent.com/Breven217/78add136e29ae98a8ed1a2c28d4f8d80/raw/server-config.json";
pub const DEFAULT_REGISTRY_PATH: &str = "~/.codeium/windsurf/mcp_config.json";
pub const DEFAULT_ENV_DIR: &str = "~/.mcp";
pub const DEFAULT_REPOS_DIR: &str = "~/.mcp/repos";
pub const DEFAULT_PACKAGE_INSTALLER: &str = "brew";
pub const DEFAULT_PACKAGE_CLIENT: &str = "claude";

/// Top-level joypack configuration.
///
/// Every key is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoypackConfig {
    /// Catalog location: an `http(s)` URL or a local file path.
    pub catalog: String,
    pub registry_path: String,
    pub env_dir: String,
    pub repos_dir: String,
    /// Program used to install missing prerequisites.
    pub package_installer: String,
    /// `--client` passed to the package registry installer.
    pub package_client: String,
    #[serde(
        rename = "build_override",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub build_overrides: Vec<BuildOverrideEntry>,
}

impl Default for JoypackConfig {
    fn default() -> Self {
        Self {
            catalog: DEFAULT_CATALOG.to_string(),
            registry_path: DEFAULT_REGISTRY_PATH.to_string(),
            env_dir: DEFAULT_ENV_DIR.to_string(),
            repos_dir: DEFAULT_REPOS_DIR.to_string(),
            package_installer: DEFAULT_PACKAGE_INSTALLER.to_string(),
            package_client: DEFAULT_PACKAGE_CLIENT.to_string(),
            build_overrides: Vec::new(),
        }
    }
}

impl JoypackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_override(&self, server: &str) -> Option<&BuildOverrideEntry> {
        self.build_overrides.iter().find(|entry| entry.server == server)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (key, value) in [
            ("catalog", &self.catalog),
            ("registry_path", &self.registry_path),
            ("env_dir", &self.env_dir),
            ("repos_dir", &self.repos_dir),
            ("package_installer", &self.package_installer),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("'{}' must not be empty", key);
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for entry in &self.build_overrides {
            if entry.server.trim().is_empty() {
                anyhow::bail!("build_override entry is missing 'server'");
            }
            if seen.contains(&entry.server.as_str()) {
                anyhow::bail!("Duplicate build_override for server '{}'", entry.server);
            }
            seen.push(&entry.server);
            if entry.steps.is_empty() {
                anyhow::bail!("build_override '{}' declares no steps", entry.server);
            }
            for step in &entry.steps {
                if step.label.trim().is_empty() || step.program.trim().is_empty() {
                    anyhow::bail!(
                        "build_override '{}' has a step without label or program",
                        entry.server
                    );
                }
            }
        }
        Ok(())
    }
}

/// Replacement build routine for one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOverrideEntry {
    pub server: String,
    #[serde(default, rename = "step")]
    pub steps: Vec<BuildStepEntry>,
}

/// One command of a build override, run in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStepEntry {
    pub label: String,
    pub program: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Defaults to the server's checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}
