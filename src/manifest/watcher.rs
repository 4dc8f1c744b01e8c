//! Manifest directory watcher.
//!
//! # Responsibilities
//! - Run reverse discovery once before watching
//! - Turn create, write and rename-in notifications for `.yaml`/`.yml` files into
//!   `ManifestSync::apply_manifest` calls, strictly one at a time
//! - Exit on shutdown, releasing the OS watch handle
//!
//! # Design Decisions
//! - Deletes and renames away are not handled; removing a manifest leaves its config
//! - Without a coalescing window every event triggers a full validate/reload
//! - With a window, repeated events for one path collapse into one apply,
//!   and distinct paths keep their first-arrival order

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::manifest::{is_manifest_path, ManifestSync};

/// Long-running task feeding manifest changes into `ManifestSync`.
pub struct ManifestWatcher {
    sync: ManifestSync,
    coalesce: Option<Duration>,
    reverse_sync_on_start: bool,
}

impl ManifestWatcher {
    pub fn new(config: &ManagerConfig, sync: ManifestSync) -> Self {
        let coalesce = (config.watch.coalesce_ms > 0)
            .then(|| Duration::from_millis(config.watch.coalesce_ms));
        Self {
            sync,
            coalesce,
            reverse_sync_on_start: !config.watch.skip_reverse_sync,
        }
    }

    /// Reverse-sync, then watch until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), notify::Error> {
        if self.reverse_sync_on_start {
            self.sync.reverse_sync().await;
        }

        let dir = self.sync.manifests_dir().to_path_buf();
        fs::create_dir_all(&dir).map_err(notify::Error::io)?;

        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_content_change(&event.kind) {
                        for path in event.paths.into_iter().filter(|p| is_manifest_path(p)) {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(dir = %dir.display(), "Watching for app manifests");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Manifest watcher received shutdown signal, exiting loop");
                    break;
                }
                next = rx.recv() => {
                    let Some(first) = next else { break };
                    let batch = match self.coalesce {
                        Some(window) => coalesce(first, &mut rx, window).await,
                        None => vec![first],
                    };
                    for path in batch {
                        self.handle(&path).await;
                    }
                }
            }
        }

        drop(watcher);
        tracing::info!(dir = %dir.display(), "Manifest watcher stopped");
        Ok(())
    }

    async fn handle(&self, path: &Path) {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Manifest vanished before processing");
            return;
        }
        tracing::info!(path = %path.display(), "Manifest changed");

        match self.sync.apply_manifest(path).await {
            Ok(config_name) => {
                tracing::debug!(path = %path.display(), config = %config_name, "Manifest applied")
            }
            Err(ManagerError::InvalidInput(reason)) => {
                tracing::warn!(path = %path.display(), reason = %reason, "Invalid manifest discarded")
            }
            Err(e @ ManagerError::ValidationFailed { .. }) => {
                tracing::warn!(path = %path.display(), error = %e, "Config invalid, not reloading")
            }
            Err(e) => tracing::error!(path = %path.display(), error = %e, "Failed to apply manifest"),
        }
    }
}

/// Creates, data writes and renames into the directory. Metadata-only
/// changes (chmod, touch) are ignored.
pub(crate) fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(modify) => matches!(
            modify,
            ModifyKind::Data(_)
                | ModifyKind::Any
                | ModifyKind::Name(RenameMode::To | RenameMode::Both | RenameMode::Any)
        ),
        _ => false,
    }
}

/// Collect events until `window` passes without a new one. Each distinct
/// path appears once, in first-arrival order.
pub(crate) async fn coalesce(
    first: PathBuf,
    rx: &mut mpsc::UnboundedReceiver<PathBuf>,
    window: Duration,
) -> Vec<PathBuf> {
    let mut batch = vec![first];
    while let Ok(Some(path)) = tokio::time::timeout(window, rx.recv()).await {
        if !batch.contains(&path) {
            batch.push(path);
        }
    }
    batch
}
