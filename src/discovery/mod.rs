//! Site discovery: the aggregate view of every known config.
//!
//! # Data Flow
//! ```text
//! ConfigStore listings
//!     sentinel + available/* + archived/*.conf
//!     → one task per site
//!         inspect::extract      (port, server name, TLS)
//!         inspect::proxy_target (upstream, optional)
//!         probe.rs              (liveness over localhost)
//!         symlink check         (enabled)
//!     → join barrier, per-task result slots
//!     → sorted Vec<SiteEntry>
//! ```
//!
//! # Design Decisions
//! - Unbounded fan-out: one task per site, no pool cap
//! - Tasks share nothing mutable; each owns its result slot
//! - No caching: every call re-reads the filesystem and re-probes
//! - A failing probe or a panicking task still yields an entry

pub mod probe;

pub use probe::{Liveness, Prober};

use std::path::PathBuf;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;

use crate::config::ProbeConfig;
use crate::error::Result;
use crate::inspect;
use crate::store::{ConfigStore, MAIN_CONFIG_NAME};

/// One row of the aggregate view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    pub name: String,
    pub path: PathBuf,
    pub display_url: String,
    pub upstream: Option<String>,
    pub is_active: Liveness,
    pub has_tls: bool,
    pub is_enabled: bool,
    pub is_archived: bool,
}

impl SiteEntry {
    pub fn is_main_config(&self) -> bool {
        self.name == MAIN_CONFIG_NAME && !self.is_archived
    }
}

/// Lists sites and probes them concurrently.
#[derive(Debug, Clone)]
pub struct SiteEnumerator {
    store: ConfigStore,
    prober: Prober,
}

impl SiteEnumerator {
    pub fn new(store: ConfigStore, config: &ProbeConfig) -> Result<Self> {
        let prober = Prober::new(Duration::from_millis(config.timeout_ms))?;
        Ok(Self { store, prober })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Every known site, sorted by name.
    pub async fn list_all(&self) -> Vec<SiteEntry> {
        let mut names: Vec<(String, bool)> = vec![(MAIN_CONFIG_NAME.to_string(), false)];
        names.extend(
            self.store
                .list_available()
                .into_iter()
                .filter(|name| name != MAIN_CONFIG_NAME)
                .map(|name| (name, false)),
        );
        names.extend(self.store.list_archived().into_iter().map(|name| (name, true)));

        let handles: Vec<_> = names
            .iter()
            .cloned()
            .map(|(name, archived)| {
                let this = self.clone();
                tokio::spawn(async move { this.describe(name, archived).await })
            })
            .collect();

        let mut sites: Vec<SiteEntry> = join_all(handles)
            .await
            .into_iter()
            .zip(names)
            .map(|(joined, (name, archived))| {
                joined.unwrap_or_else(|e| {
                    tracing::error!(site = %name, error = %e, "Site inspection task failed");
                    self.unresolved(name, archived)
                })
            })
            .collect();

        sites.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(count = sites.len(), "Sites enumerated");
        sites
    }

    fn path_for(&self, name: &str, archived: bool) -> PathBuf {
        if archived {
            self.store.archived_path(name)
        } else {
            self.store.resolve_path(name)
        }
    }

    fn enabled_for(&self, name: &str, archived: bool) -> bool {
        if archived {
            false
        } else if name == MAIN_CONFIG_NAME {
            true
        } else {
            self.store.is_enabled(name)
        }
    }

    async fn describe(&self, name: String, archived: bool) -> SiteEntry {
        let path = self.path_for(&name, archived);
        let inspection = inspect::extract(&path);
        let upstream = inspect::proxy_target(&path).ok().map(|t| t.to_string());

        let (display_url, is_active) = match inspection.details() {
            Some(details) => {
                let liveness = self
                    .prober
                    .probe(&details.check_url(), details.public_name())
                    .await;
                (details.display_url(), liveness)
            }
            None => ("N/A".to_string(), Liveness::Inactive),
        };

        SiteEntry {
            is_enabled: self.enabled_for(&name, archived),
            has_tls: inspection.has_tls(),
            name,
            path,
            display_url,
            upstream,
            is_active,
            is_archived: archived,
        }
    }

    /// Entry for a site whose task died before producing one.
    fn unresolved(&self, name: String, archived: bool) -> SiteEntry {
        SiteEntry {
            path: self.path_for(&name, archived),
            is_enabled: self.enabled_for(&name, archived),
            name,
            display_url: "N/A".to_string(),
            upstream: None,
            is_active: Liveness::Inactive,
            has_tls: false,
            is_archived: archived,
        }
    }
}
