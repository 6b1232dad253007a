//! Install, uninstall, and configuration of servers.

pub mod install;
pub mod locks;
pub mod service;
pub mod state;
pub mod uninstall;

pub use install::{
    CLONE_STEP, CONTAINER_STEP, ENV_FILE_STEP, InstallPlan, InstallReport, PACKAGE_STEP,
    REGISTRY_STEP, SETUP_STEP, WRAPPER_STEP,
};
pub use locks::ServerLocks;
pub use service::Installer;
pub use state::{InstallRun, InstallState};
pub use uninstall::{
    ENV_FILE_REMOVAL_STEP, REGISTRY_REMOVAL_STEP, TEARDOWN_STEP, UninstallReport,
    WRAPPER_REMOVAL_STEP, remove_path_if_exists,
};
