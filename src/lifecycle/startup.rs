//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the store, enumerator and sync engine from one `ManagerConfig`
//! - Start background tasks (manifest watcher, console, signal handler)
//! - Bind the admin API and serve it until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (requests only when the engine is ready)
//! - The watcher is awaited after the API drains so its OS handle is released

use std::error::Error;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::api::{self, ApiState};
use crate::config::ManagerConfig;
use crate::control::NginxControl;
use crate::discovery::SiteEnumerator;
use crate::lifecycle::{console, signals, Shutdown};
use crate::manifest::{ManifestSync, ManifestWatcher};
use crate::store::ConfigStore;

/// Run the manager until a signal or the console asks it to stop.
pub async fn run(config: ManagerConfig, interactive: bool) -> Result<(), Box<dyn Error>> {
    let shutdown = Shutdown::new();

    let control = Arc::new(NginxControl::new(&config.proxy));
    let store = ConfigStore::new(&config.layout, control);
    let enumerator = SiteEnumerator::new(store.clone(), &config.probe)?;

    let sites = enumerator.list_all().await;
    let active = sites.iter().filter(|s| s.is_active.is_active()).count();
    let enabled = sites.iter().filter(|s| s.is_enabled).count();
    tracing::info!(
        total = sites.len(),
        enabled,
        active,
        available_dir = %config.layout.available_dir.display(),
        "Initial site scan complete"
    );
    for site in &sites {
        tracing::debug!(
            site = %site.name,
            url = %site.display_url,
            enabled = site.is_enabled,
            archived = site.is_archived,
            "Known site"
        );
    }

    let sync = ManifestSync::new(&config, enumerator.clone());
    let watcher = ManifestWatcher::new(&config, sync.clone());
    let watcher_task = tokio::spawn(watcher.run(shutdown.subscribe()));

    if interactive {
        tracing::info!("Shortcuts: [r] reload  [R] validate + reload  [q] quit");
        let input = console::stdin_lines();
        tokio::spawn(console::run(input, store.clone(), shutdown.clone()));
    }
    tokio::spawn(signals::trigger_on_signal(shutdown.clone()));

    let state = ApiState::new(sync, enumerator, config.api.api_key.as_deref());
    let listener = TcpListener::bind(&config.api.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    // The API can also stop on its own; make sure the watcher follows.
    shutdown.trigger();
    match watcher_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Manifest watcher failed"),
        Err(e) => tracing::error!(error = %e, "Manifest watcher task panicked"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
