//! Enable / disable / archive / restore.
//!
//! Enabled state is a symlink `enabled/<name>` → `available/<name>`.
//! Archiving moves the file out of available; restoring moves it back but
//! never re-enables it.

use std::fs;
use std::io;
use std::path::Path;

use super::{check_name, ConfigStore, MAIN_CONFIG_NAME};
use crate::error::{ManagerError, Result};

impl ConfigStore {
    /// Link `name` into the enabled directory. Already linked is success.
    pub fn enable(&self, name: &str) -> Result<()> {
        check_mutable(name)?;
        let enabled_dir = self.require_enabled_dir()?;
        fs::create_dir_all(enabled_dir)
            .map_err(|e| ManagerError::io("creating directory", enabled_dir, e))?;

        let source = absolute(&self.resolve_path(name))?;
        let link = absolute(&enabled_dir.join(name))?;

        if fs::symlink_metadata(&link).is_ok() {
            tracing::debug!(name = %name, "Site already enabled");
            return Ok(());
        }
        if !source.exists() {
            return Err(ManagerError::NotFound(source.display().to_string()));
        }

        symlink(&source, &link).map_err(|e| ManagerError::io("linking", &link, e))?;
        tracing::info!(name = %name, link = %link.display(), "Site enabled");
        Ok(())
    }

    /// Remove the enabled symlink. Missing link is `NotFound`.
    pub fn disable(&self, name: &str) -> Result<()> {
        check_mutable(name)?;
        let link = self.require_enabled_dir()?.join(name);

        let meta = fs::symlink_metadata(&link).map_err(|e| ManagerError::io("reading", &link, e))?;
        if !meta.file_type().is_symlink() {
            return Err(ManagerError::InvalidInput(format!(
                "{} is not a symlink, refusing to remove it",
                link.display()
            )));
        }

        fs::remove_file(&link).map_err(|e| ManagerError::io("removing", &link, e))?;
        tracing::info!(name = %name, "Site disabled");
        Ok(())
    }

    /// Enable or disable in one call.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        if enabled {
            self.enable(name)
        } else {
            self.disable(name)
        }
    }

    /// Disable (best effort) and move the config into the archive.
    ///
    /// Not atomic: a crash between the two steps leaves the site disabled but
    /// still available, which a second `archive` or a `restore` resolves.
    pub fn archive(&self, name: &str) -> Result<()> {
        check_mutable(name)?;
        let archived_dir = &self.layout.archived_dir;
        fs::create_dir_all(archived_dir)
            .map_err(|e| ManagerError::io("creating directory", archived_dir, e))?;

        if self.enabled_dir().is_some() {
            if let Err(e) = self.disable(name) {
                tracing::debug!(name = %name, error = %e, "Disable before archive skipped");
            }
        }

        let source = self.resolve_path(name);
        let target = self.archived_path(name);
        fs::rename(&source, &target).map_err(|e| ManagerError::io("archiving", &source, e))?;
        tracing::info!(name = %name, target = %target.display(), "Site archived");
        Ok(())
    }

    /// Move an archived config back into available. Stays disabled.
    pub fn restore(&self, name: &str) -> Result<()> {
        check_mutable(name)?;
        let source = self.archived_path(name);
        let target = self.resolve_path(name);

        if target.exists() {
            return Err(ManagerError::Conflict(format!(
                "site {} already exists in available sites",
                name
            )));
        }

        fs::rename(&source, &target).map_err(|e| ManagerError::io("restoring", &source, e))?;
        tracing::info!(name = %name, "Site restored (disabled)");
        Ok(())
    }

    fn require_enabled_dir(&self) -> Result<&Path> {
        self.enabled_dir()
            .ok_or_else(|| ManagerError::InvalidInput("enabled directory not configured".into()))
    }
}

/// Valid name that is not the main-config sentinel.
fn check_mutable(name: &str) -> Result<()> {
    check_name(name)?;
    if name == MAIN_CONFIG_NAME {
        return Err(ManagerError::InvalidInput(format!(
            "cannot modify main {}",
            MAIN_CONFIG_NAME
        )));
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<std::path::PathBuf> {
    std::path::absolute(path).map_err(|e| ManagerError::io("resolving", path, e))
}

#[cfg(unix)]
fn symlink(source: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, link)
}

#[cfg(windows)]
fn symlink(source: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(source, link)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::store::tests::{layout, FakeControl};
    use std::sync::Arc;

    fn store(root: &Path) -> ConfigStore {
        let store = ConfigStore::new(&layout(root), Arc::new(FakeControl::default()));
        store.save("shop.conf", "server { listen 80; }").unwrap();
        store
    }

    #[test]
    fn test_enable_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());

        store.enable("shop.conf").unwrap();
        let link = root.path().join("sites-enabled/shop.conf");
        let target = fs::read_link(&link).unwrap();

        store.enable("shop.conf").unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), target);
        assert!(target.is_absolute());
        assert!(target.ends_with("sites-available/shop.conf"));
        assert_eq!(fs::read_dir(root.path().join("sites-enabled")).unwrap().count(), 1);
    }

    #[test]
    fn test_enable_missing_source() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        assert!(store.enable("ghost.conf").unwrap_err().is_not_found());
    }

    #[test]
    fn test_disable_without_link_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        assert!(store.disable("shop.conf").unwrap_err().is_not_found());

        store.enable("shop.conf").unwrap();
        store.disable("shop.conf").unwrap();
        assert!(!store.is_enabled("shop.conf"));
    }

    #[test]
    fn test_disable_refuses_regular_file() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        fs::create_dir_all(root.path().join("sites-enabled")).unwrap();
        fs::write(root.path().join("sites-enabled/shop.conf"), "copy").unwrap();

        assert!(matches!(
            store.disable("shop.conf"),
            Err(ManagerError::InvalidInput(_))
        ));
        assert!(root.path().join("sites-enabled/shop.conf").exists());
    }

    #[test]
    fn test_sentinel_is_protected() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        for result in [
            store.enable(MAIN_CONFIG_NAME),
            store.disable(MAIN_CONFIG_NAME),
            store.archive(MAIN_CONFIG_NAME),
            store.set_enabled(MAIN_CONFIG_NAME, false),
        ] {
            assert!(matches!(result, Err(ManagerError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_toggle_requires_enabled_dir() {
        let root = tempfile::tempdir().unwrap();
        let mut l = layout(root.path());
        l.enabled_dir = None;
        let store = ConfigStore::new(&l, Arc::new(FakeControl::default()));
        store.save("shop.conf", "").unwrap();

        assert!(matches!(
            store.enable("shop.conf"),
            Err(ManagerError::InvalidInput(_))
        ));
        // archive still works without an enabled directory
        store.archive("shop.conf").unwrap();
    }

    #[test]
    fn test_archive_disables_and_moves() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        store.enable("shop.conf").unwrap();

        store.archive("shop.conf").unwrap();
        assert!(!store.resolve_path("shop.conf").exists());
        assert!(store.archived_path("shop.conf").exists());
        assert!(fs::symlink_metadata(root.path().join("sites-enabled/shop.conf")).is_err());
    }

    #[test]
    fn test_archive_already_disabled() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        store.archive("shop.conf").unwrap();
        assert_eq!(store.list_archived(), vec!["shop.conf"]);
    }

    #[test]
    fn test_restore_conflict_and_no_reenable() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        store.enable("shop.conf").unwrap();
        store.archive("shop.conf").unwrap();

        store.save("shop.conf", "server { listen 81; }").unwrap();
        assert!(matches!(
            store.restore("shop.conf"),
            Err(ManagerError::Conflict(_))
        ));

        fs::remove_file(store.resolve_path("shop.conf")).unwrap();
        store.restore("shop.conf").unwrap();
        assert_eq!(store.get("shop.conf").unwrap(), "server { listen 80; }");
        assert!(!store.is_enabled("shop.conf"));
    }

    #[test]
    fn test_restore_missing_archive() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        assert!(store.restore("never.conf").unwrap_err().is_not_found());
    }
}
