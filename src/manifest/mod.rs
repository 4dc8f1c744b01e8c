//! Application manifests and their synchronization with server configs.
//!
//! # Data Flow
//! ```text
//! Forward (watcher.rs → sync.rs):
//!     apps/<domain>.yaml changed
//!     → Manifest (parse + required fields)
//!     → render.rs (server block text)
//!     → ConfigStore::save → enable → validate → reload
//!
//! Reverse (sync.rs, once at startup):
//!     SiteEnumerator::list_all
//!     → proxy_target per site
//!     → apps/<name>.yaml for every site without one
//! ```
//!
//! # Design Decisions
//! - A manifest is never edited in place; every change is a full rewrite
//! - `:` in a domain becomes `_` in file names, and back again in reverse
//! - Two domains that mangle to the same file name overwrite each other

pub mod render;
pub mod sync;
pub mod watcher;

pub use render::render;
pub use sync::{ManifestSync, SyncReport};
pub use watcher::ManifestWatcher;

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ManagerError, Result};
use crate::store::CONFIG_EXTENSION;

pub const MANIFEST_EXTENSION: &str = ".yaml";

/// Upstream scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Https => write!(f, "https"),
        }
    }
}

/// High-level intent: serve `domain` by forwarding to `hostname:port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: String,

    #[serde(default, deserialize_with = "protocol_or_default")]
    pub protocol: Protocol,

    #[serde(default = "default_hostname", deserialize_with = "null_as_default")]
    pub hostname: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub port: u16,
}

fn default_hostname() -> String {
    "127.0.0.1".to_string()
}

/// `key:` with no value reads as the field's zero value.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Like `null_as_default`; an empty string also reads as http.
fn protocol_or_default<'de, D>(deserializer: D) -> std::result::Result<Protocol, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(Protocol::default()),
        Some("http") => Ok(Protocol::Http),
        Some("https") => Ok(Protocol::Https),
        Some(other) => Err(serde::de::Error::unknown_variant(other, &["http", "https"])),
    }
}

impl Manifest {
    pub fn new(domain: impl Into<String>, port: u16) -> Self {
        Self {
            domain: domain.into(),
            protocol: Protocol::Http,
            hostname: default_hostname(),
            port,
        }
    }

    /// Parse YAML read from `path`.
    pub fn from_yaml(text: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| ManagerError::ParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ManagerError::InvalidInput(format!("cannot encode manifest: {}", e)))
    }

    /// Domain and port are required.
    pub fn check(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(ManagerError::InvalidInput("manifest is missing domain".into()));
        }
        if self.port == 0 {
            return Err(ManagerError::InvalidInput(format!(
                "manifest for {} is missing port",
                self.domain
            )));
        }
        Ok(())
    }

    /// Upstream host, defaulting to loopback when blank.
    pub fn upstream_host(&self) -> &str {
        match self.hostname.trim() {
            "" => "127.0.0.1",
            host => host,
        }
    }

    /// `<domain with : → _>.conf`
    pub fn config_name(&self) -> String {
        format!("{}{}", mangle(&self.domain), CONFIG_EXTENSION)
    }

    /// `<domain with : → _>.yaml`
    pub fn file_name(&self) -> String {
        format!("{}{}", mangle(&self.domain), MANIFEST_EXTENSION)
    }
}

fn mangle(domain: &str) -> String {
    domain.trim().replace(':', "_")
}

/// Manifest file name for a config name: `shop.conf` → `shop.yaml`.
pub fn manifest_name_for(config_name: &str) -> String {
    let stem = config_name.strip_suffix(CONFIG_EXTENSION).unwrap_or(config_name);
    if stem.ends_with(MANIFEST_EXTENSION) {
        return stem.to_string();
    }
    format!("{}{}", stem, MANIFEST_EXTENSION)
}

/// Inverse of the forward name mangling: `localhost_3001.conf` → `localhost:3001`.
pub fn domain_from_config_name(config_name: &str) -> String {
    config_name
        .strip_suffix(CONFIG_EXTENSION)
        .unwrap_or(config_name)
        .replace('_', ":")
}

/// `.yaml` or `.yml`.
pub fn is_manifest_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
