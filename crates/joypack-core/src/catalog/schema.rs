//! Wire format of the server catalog.
//!
//! The catalog is a JSON object keyed by server name. Each entry describes
//! the setup in loosely typed, optional fields; [`CatalogEntry::into_descriptor`]
//! turns it into a [`ServerDescriptor`] with exactly one launch strategy.

use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::types::{EnvSchema, LaunchStrategy, Runtime, ServerDescriptor};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    #[serde(default)]
    pub env: EnvSchema,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_config: Option<CatalogMcpConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_setup: Option<LocalSetupEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npx_setup: Option<NpxSetupEntry>,
    #[serde(default)]
    pub docker_wrapper: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSetupEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Runtime name: `node`, `npm`, `pnpm` or `uv`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpxSetupEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMcpConfig {
    /// Launch command registered as is when no setup method is declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_tools: Option<Vec<String>>,
}

impl CatalogEntry {
    /// Convert into a descriptor named `key` (the catalog object key wins
    /// over the entry's own `name`).
    pub fn into_descriptor(self, key: &str) -> Result<ServerDescriptor, SetupError> {
        let reject = |reason: &str| SetupError::UnknownStrategy {
            server: key.to_string(),
            reason: reason.to_string(),
        };

        let CatalogMcpConfig {
            command: direct_command,
            args: direct_args,
            disabled_tools,
        } = self.mcp_config.unwrap_or_default();
        let direct_command = direct_command.filter(|command| !command.trim().is_empty());

        let declared = [
            self.local_setup.is_some(),
            self.npx_setup.is_some(),
            self.docker_wrapper,
        ]
        .into_iter()
        .filter(|present| *present)
        .count();
        match declared {
            0 if direct_command.is_none() => {
                return Err(reject(
                    "no localSetup, npxSetup, dockerWrapper or mcpConfig.command",
                ));
            }
            0 | 1 => {}
            _ => return Err(reject("more than one setup method declared")),
        }

        let mut prerequisites = self.prerequisites;
        let strategy = if let Some(local) = self.local_setup {
            let repository_url = local
                .repo
                .filter(|repo| !repo.trim().is_empty())
                .ok_or_else(|| reject("localSetup.repo is missing"))?;
            let runtime = local
                .command
                .as_deref()
                .ok_or_else(|| reject("localSetup.command is missing"))?
                .parse::<Runtime>()
                .map_err(|err| reject(err.as_str()))?;
            let entry_point = local
                .entry_point
                .filter(|entry| !entry.trim().is_empty())
                .ok_or_else(|| reject("localSetup.entryPoint is missing"))?;
            for tool in local.prerequisites {
                if !prerequisites.contains(&tool) {
                    prerequisites.push(tool);
                }
            }
            LaunchStrategy::LocalRepo {
                repository_url,
                runtime,
                entry_point,
            }
        } else if let Some(npx) = self.npx_setup {
            let package_name = npx
                .package
                .filter(|package| !package.trim().is_empty())
                .ok_or_else(|| reject("npxSetup.package is missing"))?;
            LaunchStrategy::PackageRegistry {
                package_name,
                invocation_args: npx.args,
            }
        } else if self.docker_wrapper {
            let image_reference = self
                .docker_image
                .filter(|image| !image.trim().is_empty())
                .ok_or_else(|| reject("dockerWrapper requires dockerImage"))?;
            LaunchStrategy::ContainerImage { image_reference }
        } else {
            let command = direct_command.ok_or_else(|| reject("mcpConfig.command is missing"))?;
            LaunchStrategy::DirectCommand {
                command,
                args: direct_args,
            }
        };

        let mut descriptor = ServerDescriptor::new(key, strategy).with_prerequisites(prerequisites);
        descriptor.display_name = self.display_name;
        descriptor.description = self.description;
        descriptor.docs_url = self.docs_url;
        descriptor.environment_schema = self.env;
        descriptor.disabled_tools = disabled_tools.unwrap_or_default();
        Ok(descriptor)
    }
}
