//! User configuration (`joypack.toml`).
//!
//! Holds the locations joypack reads and writes (catalog, MCP registry,
//! environment files, repository checkouts), the package installer used for
//! missing prerequisites, and per-server build overrides.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_joypack_toml, parse_joypack_toml_str, to_toml};
pub use paths::expand_home;
pub use schema::{
    BuildOverrideEntry, BuildStepEntry, DEFAULT_CATALOG, DEFAULT_ENV_DIR,
    DEFAULT_PACKAGE_CLIENT, DEFAULT_PACKAGE_INSTALLER, DEFAULT_REGISTRY_PATH,
    DEFAULT_REPOS_DIR, JoypackConfig,
};
pub use store::ConfigStore;
