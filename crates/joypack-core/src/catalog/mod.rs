//! Server catalog: the list of installable servers, fetched fresh on every
//! load and merged with the registry.

pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use url::Url;

use crate::config::expand_home;
use crate::registry::RegistryDocument;
use crate::types::{LaunchConfig, ServerDescriptor};

pub use schema::{CatalogEntry, CatalogMcpConfig, LocalSetupEntry, NpxSetupEntry};

/// Where the catalog document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Remote(Url),
    File(PathBuf),
}

impl CatalogSource {
    /// `http(s)://` locations are URLs; anything else is a path (`~` expanded).
    pub fn parse(raw: &str, home: &Path) -> anyhow::Result<Self> {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = Url::parse(raw).with_context(|| format!("Invalid catalog URL: {raw}"))?;
            Ok(CatalogSource::Remote(url))
        } else {
            if raw.is_empty() {
                anyhow::bail!("Catalog location is empty");
            }
            Ok(CatalogSource::File(expand_home(raw, home)))
        }
    }
}

impl std::fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogSource::Remote(url) => write!(f, "{url}"),
            CatalogSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Parsed catalog, ordered by server name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    servers: Vec<ServerDescriptor>,
}

impl Catalog {
    /// Parse a catalog document. Entries without a usable launch strategy
    /// are skipped with a warning.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        let entries: BTreeMap<String, CatalogEntry> =
            serde_json::from_str(content).context("Failed to parse server catalog")?;

        let mut servers = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            match entry.into_descriptor(&key) {
                Ok(descriptor) => servers.push(descriptor),
                Err(err) => tracing::warn!(server = %key, "Skipping catalog entry: {}", err),
            }
        }
        Ok(Self { servers })
    }

    /// Fetch and parse the catalog, bypassing HTTP caches.
    pub async fn fetch(source: &CatalogSource) -> anyhow::Result<Self> {
        let content = match source {
            CatalogSource::Remote(url) => fetch_remote(url).await?,
            CatalogSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read catalog file: {}", path.display()))?,
        };
        Self::parse_str(&content).with_context(|| format!("Invalid catalog at {source}"))
    }

    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    pub fn get(&self, name: &str) -> Option<&ServerDescriptor> {
        self.servers.iter().find(|server| server.name == name)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Split the catalog by registry state. Registry entries without a
    /// catalog counterpart are reported as unlisted.
    pub fn merge(&self, registry: &RegistryDocument) -> ServerListing {
        let mut listing = ServerListing::default();
        for server in &self.servers {
            match registry.get(&server.name) {
                Some(config) => {
                    let mut installed = server.clone();
                    installed.launch_config = Some(config.clone());
                    listing.installed.push(installed);
                }
                None => listing.available.push(server.clone()),
            }
        }
        for (name, config) in &registry.servers {
            if self.get(name).is_none() {
                listing.unlisted.push((name.clone(), config.clone()));
            }
        }
        listing
    }
}

async fn fetch_remote(url: &Url) -> anyhow::Result<String> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("joypack/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    tracing::debug!(%url, "Fetching server catalog");
    let response = client
        .get(url.clone())
        .header(reqwest::header::CACHE_CONTROL, "no-cache")
        .send()
        .await
        .with_context(|| format!("Failed to fetch catalog from {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!(
            "Failed to fetch catalog: HTTP {} from {}",
            response.status(),
            url
        );
    }

    response
        .text()
        .await
        .context("Failed to read catalog response")
}

/// Result of merging the catalog with the registry.
#[derive(Debug, Clone, Default)]
pub struct ServerListing {
    /// Catalog servers present in the registry, with their registry record.
    pub installed: Vec<ServerDescriptor>,
    /// Catalog servers not yet installed.
    pub available: Vec<ServerDescriptor>,
    /// Registry entries the catalog does not describe.
    pub unlisted: Vec<(String, LaunchConfig)>,
}
