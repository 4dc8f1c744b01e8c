//! Forward and reverse manifest synchronization.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ManagerConfig;
use crate::discovery::{SiteEntry, SiteEnumerator};
use crate::error::{ManagerError, Result};
use crate::inspect;
use crate::manifest::{domain_from_config_name, manifest_name_for, render, Manifest};
use crate::observability::metrics;
use crate::store::ConfigStore;

/// Outcome of one reverse-discovery pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Manifests written by this pass.
    pub created: Vec<PathBuf>,
    /// Sites that already had a manifest.
    pub existing: usize,
    /// Sites that are not reverse proxies, or could not be written.
    pub skipped: usize,
}

/// Converts manifests into activated configs and back.
#[derive(Debug, Clone)]
pub struct ManifestSync {
    store: ConfigStore,
    enumerator: SiteEnumerator,
    manifests_dir: PathBuf,
    listen_port: u16,
}

impl ManifestSync {
    pub fn new(config: &ManagerConfig, enumerator: SiteEnumerator) -> Self {
        Self {
            store: enumerator.store().clone(),
            enumerator,
            manifests_dir: config.layout.manifests_dir.clone(),
            listen_port: config.proxy.listen_port,
        }
    }

    pub fn manifests_dir(&self) -> &Path {
        &self.manifests_dir
    }

    /// Generate, save, enable and activate the config for one manifest file.
    ///
    /// Returns the generated config name. A failed validation leaves the
    /// config saved but not loaded.
    pub async fn apply_manifest(&self, path: &Path) -> Result<String> {
        let text = fs::read_to_string(path).map_err(|e| ManagerError::io("reading", path, e))?;
        let manifest = Manifest::from_yaml(&text, path)?;
        manifest.check()?;

        let config_name = manifest.config_name();
        tracing::info!(domain = %manifest.domain, config = %config_name, "Generating config");
        self.store
            .save(&config_name, &render(&manifest, self.listen_port))?;

        if self.store.enabled_dir().is_some() {
            if let Err(e) = self.store.enable(&config_name) {
                tracing::warn!(config = %config_name, error = %e, "Failed to enable site");
            }
        }

        if let Err(e) = self.store.apply().await {
            metrics::record_manifest_applied("rejected");
            return Err(e);
        }

        metrics::record_manifest_applied("deployed");
        tracing::info!(domain = %manifest.domain, "Successfully deployed");
        Ok(config_name)
    }

    /// Write `manifest` into the manifest directory for the watcher to pick up.
    pub fn create_manifest(&self, manifest: &Manifest) -> Result<PathBuf> {
        manifest.check()?;
        let file_name = manifest.file_name();
        if file_name.contains(['/', '\\']) {
            return Err(ManagerError::InvalidInput(format!(
                "\"{}\" cannot be used as a manifest name",
                manifest.domain
            )));
        }

        fs::create_dir_all(&self.manifests_dir)
            .map_err(|e| ManagerError::io("creating directory", &self.manifests_dir, e))?;
        let path = self.manifests_dir.join(file_name);
        fs::write(&path, manifest.to_yaml()?).map_err(|e| ManagerError::io("writing", &path, e))?;
        tracing::info!(domain = %manifest.domain, path = %path.display(), "Manifest created");
        Ok(path)
    }

    /// Reverse discovery: write a manifest for every proxying site that has
    /// none. Existing manifests are never touched.
    pub async fn reverse_sync(&self) -> SyncReport {
        tracing::info!(dir = %self.manifests_dir.display(), "Starting reverse discovery");
        let mut report = SyncReport::default();

        if let Err(e) = fs::create_dir_all(&self.manifests_dir) {
            tracing::error!(dir = %self.manifests_dir.display(), error = %e, "Cannot create manifest directory");
            return report;
        }

        for site in self.enumerator.list_all().await {
            if site.is_main_config() || site.is_archived {
                continue;
            }
            match self.reverse_one(&site) {
                Ok(Some(path)) => {
                    tracing::info!(site = %site.name, manifest = %path.display(), "Reverse discovery created manifest");
                    metrics::record_reverse_sync_created();
                    report.created.push(path);
                }
                Ok(None) => report.existing += 1,
                Err(e) => {
                    if !e.is_not_found() {
                        tracing::warn!(site = %site.name, error = %e, "Reverse discovery skipped site");
                    }
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            created = report.created.len(),
            existing = report.existing,
            skipped = report.skipped,
            "Reverse discovery finished"
        );
        report
    }

    /// `Ok(None)` when a `.yaml` or `.yml` manifest already exists.
    fn reverse_one(&self, site: &SiteEntry) -> Result<Option<PathBuf>> {
        let target = inspect::proxy_target(&site.path)?;

        let path = self.manifests_dir.join(manifest_name_for(&site.name));
        if path.exists() || path.with_extension("yml").exists() {
            return Ok(None);
        }

        let inspection = inspect::extract(&site.path);
        let manifest = Manifest {
            domain: reverse_domain(&site.name, inspection.public_name()),
            protocol: target.protocol,
            hostname: target.host,
            port: target.port,
        };

        fs::write(&path, manifest.to_yaml()?).map_err(|e| ManagerError::io("writing", &path, e))?;
        Ok(Some(path))
    }
}

/// Domain for a reverse-discovered manifest.
///
/// The parsed server name is preferred. The file name form wins when it is
/// `host:port` for that same host, since it also carries the listen port.
fn reverse_domain(config_name: &str, server_name: Option<&str>) -> String {
    let from_file = domain_from_config_name(config_name);
    match server_name {
        Some(name) => match inspect::split_host_port(&from_file) {
            Some((host, _)) if host == name => from_file,
            _ => name.to_string(),
        },
        None => from_file,
    }
}
