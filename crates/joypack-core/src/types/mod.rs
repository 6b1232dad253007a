//! Shared domain types: server descriptors, launch strategies, and the
//! launch configuration persisted in the registry.

mod env;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::expand_home;

pub use env::{EnvSchema, EnvValues, EnvVarKind, EnvVarSpec};

/// Toolchain used to build and launch a locally cloned server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Node,
    Npm,
    Pnpm,
    Uv,
}

impl Runtime {
    pub fn as_str(self) -> &'static str {
        match self {
            Runtime::Node => "node",
            Runtime::Npm => "npm",
            Runtime::Pnpm => "pnpm",
            Runtime::Uv => "uv",
        }
    }

    /// Package manager that installs and builds the checkout.
    pub fn build_tool(self) -> &'static str {
        match self {
            Runtime::Node | Runtime::Npm => "npm",
            Runtime::Pnpm => "pnpm",
            Runtime::Uv => "uv",
        }
    }

    /// Command prefix used by the wrapper script to start the entry point.
    pub fn launch_command(self) -> &'static str {
        match self {
            Runtime::Node | Runtime::Npm | Runtime::Pnpm => "node",
            Runtime::Uv => "uv run",
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Runtime {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "node" => Ok(Runtime::Node),
            "npm" => Ok(Runtime::Npm),
            "pnpm" => Ok(Runtime::Pnpm),
            "uv" => Ok(Runtime::Uv),
            other => Err(format!("unsupported runtime: {other} (node|npm|pnpm|uv)")),
        }
    }
}

/// How a server is installed and launched. Exactly one applies per server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LaunchStrategy {
    /// Clone a repository, build it, and run an entry point from the checkout.
    LocalRepo {
        repository_url: String,
        runtime: Runtime,
        entry_point: String,
    },
    /// Install from the package registry and run through `npx`.
    PackageRegistry {
        package_name: String,
        invocation_args: Vec<String>,
    },
    /// Run a container image after logging in to its registry.
    ContainerImage { image_reference: String },
    /// Register a catalog-supplied command as is, without a wrapper script.
    DirectCommand { command: String, args: Vec<String> },
}

impl LaunchStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            LaunchStrategy::LocalRepo { .. } => "local repository",
            LaunchStrategy::PackageRegistry { .. } => "package registry",
            LaunchStrategy::ContainerImage { .. } => "container image",
            LaunchStrategy::DirectCommand { .. } => "direct command",
        }
    }

    /// Whether installing writes a launcher script.
    pub fn uses_wrapper(&self) -> bool {
        !matches!(self, LaunchStrategy::DirectCommand { .. })
    }

    /// Tools the strategy needs on the path in addition to declared ones.
    pub fn implied_tools(&self) -> Vec<&'static str> {
        match self {
            LaunchStrategy::LocalRepo { runtime, .. } => vec![runtime.build_tool()],
            LaunchStrategy::PackageRegistry { .. } | LaunchStrategy::DirectCommand { .. } => {
                Vec::new()
            }
            LaunchStrategy::ContainerImage { .. } => vec!["docker"],
        }
    }
}

/// One installable integration from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerDescriptor {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub docs_url: Option<String>,
    pub environment_schema: EnvSchema,
    pub launch_strategy: LaunchStrategy,
    pub prerequisites: Vec<String>,
    pub disabled_tools: Vec<String>,
    /// Registry record; `None` until the server has been installed.
    pub launch_config: Option<LaunchConfig>,
}

impl ServerDescriptor {
    pub fn new(name: impl Into<String>, launch_strategy: LaunchStrategy) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
            docs_url: None,
            environment_schema: EnvSchema::default(),
            launch_strategy,
            prerequisites: Vec::new(),
            disabled_tools: Vec::new(),
            launch_config: None,
        }
    }

    pub fn with_prerequisites<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env_var(mut self, name: impl Into<String>, spec: EnvVarSpec) -> Self {
        self.environment_schema.insert(name, spec);
        self
    }

    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Declared prerequisites followed by the strategy's implied tools,
    /// without duplicates.
    pub fn required_tools(&self) -> Vec<String> {
        let mut tools: Vec<String> = Vec::new();
        let declared = self.prerequisites.iter().map(String::as_str);
        let implied = self.launch_strategy.implied_tools();
        for tool in declared.chain(implied) {
            if !tools.iter().any(|t| t == tool) {
                tools.push(tool.to_string());
            }
        }
        tools
    }

    /// Values to persist: schema variables with a non-empty value, in schema
    /// order.
    pub fn environment_values(&self, supplied: &EnvValues) -> EnvValues {
        self.environment_schema
            .names()
            .filter_map(|name| {
                supplied
                    .get(name)
                    .filter(|value| !value.is_empty())
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect()
    }

    /// Tools to keep disabled when a new launch config is produced.
    pub fn current_disabled_tools(&self) -> Vec<String> {
        self.launch_config
            .as_ref()
            .and_then(|config| config.disabled_tools.clone())
            .unwrap_or_else(|| self.disabled_tools.clone())
    }
}

/// Invocation record stored under `mcpServers.<name>` in the registry file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_tools: Option<Vec<String>>,
    /// Keys written by the assistant or by hand that this tool does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LaunchConfig {
    pub fn for_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_disabled_tools(mut self, tools: Vec<String>) -> Self {
        self.disabled_tools = Some(tools);
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled.unwrap_or(false)
    }

    /// Expand a leading `~` in the command and arguments against `home`.
    /// A `~` anywhere else is part of the path and stays as written.
    pub fn with_home(mut self, home: &Path) -> Self {
        self.command = expand_leading_tilde(&self.command, home);
        if let Some(args) = self.args.as_mut() {
            for arg in args.iter_mut() {
                *arg = expand_leading_tilde(arg, home);
            }
        }
        self
    }
}

fn expand_leading_tilde(value: &str, home: &Path) -> String {
    expand_home(value, home).to_string_lossy().into_owned()
}
