//! The assistant's MCP registry file.
//!
//! A server counts as installed exactly when its name is a key of
//! `mcpServers`. Anything else in the file belongs to the assistant and is
//! carried through untouched.

pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::LaunchConfig;

pub use store::RegistryStore;

/// In-memory form of the registry file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(rename = "mcpServers", default)]
    pub servers: BTreeMap<String, LaunchConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegistryDocument {
    pub fn contains(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&LaunchConfig> {
        self.servers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }
}
