//! Error taxonomy for the setup pipeline.

use std::path::PathBuf;

/// Errors raised while installing, configuring, or removing a server.
///
/// Every variant carries the cause that produced it so the caller can render
/// it without consulting the progress stream.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Prerequisite '{tool}' is not met: {reason}")]
    UnmetPrerequisite { tool: String, reason: String },

    #[error("Failed to clone {url}: {reason}")]
    Clone { url: String, reason: String },

    #[error("{phase} failed: {reason}")]
    Build { phase: String, reason: String },

    #[error("Failed to create wrapper script {}: {source}", path.display())]
    WrapperCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to access MCP registry {}: {source}", path.display())]
    RegistryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write environment file {}: {source}", path.display())]
    EnvFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Server '{server}' has no usable launch strategy: {reason}")]
    UnknownStrategy { server: String, reason: String },

    #[error("Server '{server}' is not installed")]
    ServerNotInstalled { server: String },
}

impl SetupError {
    /// Stable tag naming the kind of failure.
    pub fn kind(&self) -> &'static str {
        match self {
            SetupError::UnmetPrerequisite { .. } => "UnmetPrerequisite",
            SetupError::Clone { .. } => "CloneError",
            SetupError::Build { .. } => "BuildError",
            SetupError::WrapperCreation { .. } => "WrapperCreationError",
            SetupError::RegistryIo { .. } => "RegistryIOError",
            SetupError::EnvFileIo { .. } => "EnvFileIOError",
            SetupError::UnknownStrategy { .. } => "UnknownStrategyError",
            SetupError::ServerNotInstalled { .. } => "ServerNotInstalled",
        }
    }

    pub(crate) fn registry_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SetupError::RegistryIo {
            path: path.into(),
            source,
        }
    }
}
