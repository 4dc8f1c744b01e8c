//! Config store: the on-disk catalogue of server configs.
//!
//! # Data Flow
//! ```text
//! available/<name>        all known configs (source of truth for content)
//!     ↑ symlink
//! enabled/<name>          the subset nginx actually loads
//! archived/<name>         retired configs, moved out of available
//! main_config             sentinel "nginx.conf", always enabled
//!
//! mutation (save / enable / disable / archive / restore)
//!     → validate (nginx -t)
//!     → reload (nginx -s reload)
//! ```
//!
//! # Design Decisions
//! - The filesystem is the only store; no index, no cache
//! - Mutations are not rolled back when validate/reload fails; the
//!   caller re-runs `apply` after fixing the config
//! - Idempotent where possible (enable twice is a no-op)

mod lifecycle;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::LayoutConfig;
use crate::control::ProxyControl;
use crate::error::{ManagerError, Result};
use crate::observability::metrics;

/// Name under which the main nginx.conf is exposed.
pub const MAIN_CONFIG_NAME: &str = "nginx.conf";

/// Extension of generated and archived server configs.
pub const CONFIG_EXTENSION: &str = ".conf";

/// Owns the directory layout and the proxy control handle.
#[derive(Clone)]
pub struct ConfigStore {
    layout: LayoutConfig,
    control: Arc<dyn ProxyControl>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    pub fn new(layout: &LayoutConfig, control: Arc<dyn ProxyControl>) -> Self {
        Self {
            layout: layout.clone(),
            control,
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn enabled_dir(&self) -> Option<&Path> {
        self.layout.enabled_dir.as_deref()
    }

    /// Sentinel maps to the main config; everything else lives in available.
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        if name == MAIN_CONFIG_NAME {
            return self.layout.main_config.clone();
        }
        self.layout.available_dir.join(name)
    }

    pub fn archived_path(&self, name: &str) -> PathBuf {
        self.layout.archived_dir.join(name)
    }

    /// Raw content of a config.
    pub fn get(&self, name: &str) -> Result<String> {
        check_name(name)?;
        let path = self.resolve_path(name);
        fs::read_to_string(&path).map_err(|e| ManagerError::io("reading", &path, e))
    }

    /// Write a config, creating its directory. No validation happens here.
    pub fn save(&self, name: &str, content: &str) -> Result<()> {
        check_name(name)?;
        let path = self.resolve_path(name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ManagerError::io("creating directory", dir, e))?;
        }
        fs::write(&path, content).map_err(|e| ManagerError::io("writing", &path, e))?;
        tracing::info!(name = %name, path = %path.display(), "Config saved");
        Ok(())
    }

    /// Whether a same-named link exists in the enabled directory.
    /// Without an enabled directory every available config counts as enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        match self.enabled_dir() {
            Some(dir) => fs::symlink_metadata(dir.join(name)).is_ok(),
            None => true,
        }
    }

    /// Non-hidden, non-directory entries of the available directory.
    pub fn list_available(&self) -> Vec<String> {
        list_dir(&self.layout.available_dir, |name| !name.starts_with('.'))
    }

    /// `.conf` entries of the archived directory.
    pub fn list_archived(&self) -> Vec<String> {
        list_dir(&self.layout.archived_dir, |name| name.ends_with(CONFIG_EXTENSION))
    }

    pub async fn validate(&self) -> Result<()> {
        self.control.validate().await.inspect_err(|e| {
            metrics::record_activation_failure("validate");
            tracing::warn!(error = %e, "nginx rejected configuration");
        })
    }

    pub async fn reload(&self) -> Result<()> {
        self.control.reload().await.inspect_err(|e| {
            metrics::record_activation_failure("reload");
            tracing::error!(error = %e, "nginx reload failed");
        })?;
        tracing::info!("nginx reloaded");
        Ok(())
    }

    /// Validate then reload, stopping at the first failure.
    pub async fn apply(&self) -> Result<()> {
        self.validate().await?;
        self.reload().await
    }

    pub async fn issue_certificate(&self, domain: &str) -> Result<()> {
        if domain.trim().is_empty() {
            return Err(ManagerError::InvalidInput("domain is required".into()));
        }
        self.control.issue_certificate(domain).await?;
        tracing::info!(domain = %domain, "Certificate installed");
        Ok(())
    }
}

/// Reject names that would escape the managed directories.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ManagerError::InvalidInput(format!(
            "\"{}\" is not a valid config name",
            name
        )));
    }
    Ok(())
}

/// Sorted file names in `dir` accepted by `keep`. A missing directory is empty.
fn list_dir(dir: &Path, keep: impl Fn(&str) -> bool) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| keep(name))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records calls and fails on demand.
    #[derive(Default)]
    pub struct FakeControl {
        pub calls: Mutex<Vec<&'static str>>,
        pub fail_validate: bool,
    }

    #[async_trait]
    impl ProxyControl for FakeControl {
        async fn validate(&self) -> Result<()> {
            self.calls.lock().unwrap().push("validate");
            if self.fail_validate {
                return Err(ManagerError::ValidationFailed {
                    output: "bad".into(),
                });
            }
            Ok(())
        }

        async fn reload(&self) -> Result<()> {
            self.calls.lock().unwrap().push("reload");
            Ok(())
        }

        async fn issue_certificate(&self, _domain: &str) -> Result<()> {
            self.calls.lock().unwrap().push("certificate");
            Ok(())
        }
    }

    pub fn layout(root: &Path) -> LayoutConfig {
        LayoutConfig {
            available_dir: root.join("sites-available"),
            enabled_dir: Some(root.join("sites-enabled")),
            archived_dir: root.join("sites-archived"),
            manifests_dir: root.join("apps"),
            main_config: root.join("nginx.conf"),
        }
    }

    #[test]
    fn test_resolve_path() {
        let store = ConfigStore::new(&layout(Path::new("/x")), Arc::new(FakeControl::default()));
        assert_eq!(store.resolve_path("nginx.conf"), PathBuf::from("/x/nginx.conf"));
        assert_eq!(
            store.resolve_path("a.conf"),
            PathBuf::from("/x/sites-available/a.conf")
        );
    }

    #[test]
    fn test_save_creates_directory_and_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(&layout(root.path()), Arc::new(FakeControl::default()));

        store.save("a.conf", "server {}").unwrap();
        store.save("a.conf", "server { listen 81; }").unwrap();
        assert_eq!(store.get("a.conf").unwrap(), "server { listen 81; }");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(&layout(root.path()), Arc::new(FakeControl::default()));
        assert!(store.get("missing.conf").unwrap_err().is_not_found());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let root = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(&layout(root.path()), Arc::new(FakeControl::default()));
        for name in ["", ".", "..", "../etc/passwd", "a/b.conf"] {
            assert!(matches!(
                store.save(name, "x"),
                Err(ManagerError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_listing_filters() {
        let root = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(&layout(root.path()), Arc::new(FakeControl::default()));
        let l = store.layout().clone();
        fs::create_dir_all(l.available_dir.join("subdir")).unwrap();
        fs::create_dir_all(&l.archived_dir).unwrap();
        fs::write(l.available_dir.join("b.conf"), "").unwrap();
        fs::write(l.available_dir.join("default"), "").unwrap();
        fs::write(l.available_dir.join(".hidden"), "").unwrap();
        fs::write(l.archived_dir.join("old.conf"), "").unwrap();
        fs::write(l.archived_dir.join("notes.txt"), "").unwrap();

        assert_eq!(store.list_available(), vec!["b.conf", "default"]);
        assert_eq!(store.list_archived(), vec!["old.conf"]);
    }

    #[tokio::test]
    async fn test_apply_stops_after_failed_validate() {
        let control = Arc::new(FakeControl {
            fail_validate: true,
            ..Default::default()
        });
        let store = ConfigStore::new(&layout(Path::new("/x")), control.clone());

        let err = store.apply().await.unwrap_err();
        assert!(matches!(err, ManagerError::ValidationFailed { .. }));
        assert_eq!(*control.calls.lock().unwrap(), vec!["validate"]);
    }

    #[tokio::test]
    async fn test_apply_runs_both_steps() {
        let control = Arc::new(FakeControl::default());
        let store = ConfigStore::new(&layout(Path::new("/x")), control.clone());
        store.apply().await.unwrap();
        assert_eq!(*control.calls.lock().unwrap(), vec!["validate", "reload"]);
    }
}
