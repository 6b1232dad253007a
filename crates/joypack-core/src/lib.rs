//! Joypack Core Library
//!
//! Installs MCP servers described by a remote catalog into an assistant's
//! registry file: checks tool prerequisites, provisions and builds the
//! server, writes its environment file and launcher script, and records the
//! launch configuration. Progress is reported step by step on a
//! [`ProgressBus`](progress::ProgressBus).

pub mod catalog;
pub mod config;
pub mod context;
pub mod env_file;
pub mod error;
pub mod orchestration;
pub mod process;
pub mod progress;
pub mod registry;
pub mod setup;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, JoypackConfig};
    pub use crate::context::AppContext;

    // Catalog and registry
    pub use crate::catalog::{Catalog, CatalogSource, ServerListing};
    pub use crate::registry::{RegistryDocument, RegistryStore};

    // Domain types
    pub use crate::types::{
        EnvSchema, EnvValues, EnvVarKind, EnvVarSpec, LaunchConfig, LaunchStrategy, Runtime,
        ServerDescriptor,
    };

    // Pipeline
    pub use crate::error::SetupError;
    pub use crate::orchestration::{InstallReport, Installer, UninstallReport};
    pub use crate::process::{CommandRunner, SystemRunner};
    pub use crate::progress::{InstallationStep, ProgressBus, ProgressTracker, StepStatus};
}
