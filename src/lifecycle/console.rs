//! Interactive console shortcuts.
//!
//! - `r` reloads nginx
//! - `R` validates, then reloads
//! - `q` shuts the manager down
//!
//! Stdin is read on a detached OS thread. A blocked read never holds up
//! runtime shutdown; the thread dies with the process.

use std::io::BufRead;

use tokio::sync::mpsc;

use crate::lifecycle::Shutdown;
use crate::store::ConfigStore;

/// Forward stdin lines into a channel from a dedicated thread.
pub fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    let spawned = std::thread::Builder::new()
        .name("console-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Console disabled: cannot start stdin reader");
    }
    rx
}

/// Handle shortcut lines until the input closes, `q`, or shutdown.
pub async fn run(mut input: mpsc::Receiver<String>, store: ConfigStore, shutdown: Shutdown) {
    let mut stopped = shutdown.subscribe();

    loop {
        let line = tokio::select! {
            _ = stopped.recv() => return,
            line = input.recv() => line,
        };
        let Some(line) = line else {
            tracing::debug!("Console input closed");
            return;
        };

        match line.trim() {
            "r" => {
                tracing::info!("Shortcut [r]: reloading nginx");
                if store.reload().await.is_ok() {
                    tracing::info!("Reload successful");
                }
            }
            "R" => {
                tracing::info!("Shortcut [R]: validating and reloading nginx");
                match store.apply().await {
                    Ok(()) => tracing::info!("Configuration validated and reloaded"),
                    Err(e) => tracing::warn!(error = %e, "Validate and reload failed"),
                }
            }
            "q" => {
                tracing::info!("Shortcut [q]: quitting");
                shutdown.trigger();
                return;
            }
            "" => {}
            other => tracing::debug!(input = %other, "Unknown shortcut"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{layout, FakeControl};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shortcuts() {
        let control = Arc::new(FakeControl::default());
        let store = ConfigStore::new(&layout(Path::new("/x")), control.clone());
        let shutdown = Shutdown::new();
        let mut stopped = shutdown.subscribe();

        let (tx, rx) = mpsc::channel(16);
        for line in ["r", "", "x", "R", "q", "r"] {
            tx.send(line.to_string()).await.unwrap();
        }

        run(rx, store, shutdown).await;

        assert_eq!(
            *control.calls.lock().unwrap(),
            vec!["reload", "validate", "reload"]
        );
        assert!(stopped.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_for_input() {
        let control = Arc::new(FakeControl::default());
        let store = ConfigStore::new(&layout(Path::new("/x")), control.clone());
        let shutdown = Shutdown::new();

        // Sender stays open: the console is idle, waiting for a keypress.
        let (_tx, rx) = mpsc::channel::<String>(1);
        let console = tokio::spawn(run(rx, store, shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), console)
            .await
            .expect("console kept running after shutdown")
            .unwrap();
        assert!(control.calls.lock().unwrap().is_empty());
    }
}
