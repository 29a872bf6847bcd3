use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::scope::Scope;

/// Owns the root scope and turns termination signals into its cancellation.
#[derive(Clone)]
pub struct Lifecycle {
    root: Scope,
    stopped: Arc<AtomicBool>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            root: Scope::root(),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn root_scope(&self) -> Scope {
        self.root.clone()
    }

    /// Cancel the root scope. Only the first call has an effect.
    pub fn shutdown(&self) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        info!("Shutting down...");
        self.root.cancel();
        true
    }

    /// Spawn a task that calls `shutdown` on the first SIGINT or SIGTERM.
    pub fn watch_signals(&self) -> JoinHandle<()> {
        let lifecycle = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                signal = wait_for_signal() => match signal {
                    Ok(name) => info!("Received {}", name),
                    Err(e) => error!("Unable to listen for shutdown signal: {:#}", e),
                },
                _ = lifecycle.root.done() => return,
            }
            lifecycle.shutdown();
        })
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let lifecycle = Lifecycle::new();
        let child = lifecycle.root_scope().child(Duration::from_secs(60));

        assert!(lifecycle.shutdown());
        assert!(!lifecycle.shutdown());
        assert!(lifecycle.root_scope().is_cancelled());
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_watcher_exits_after_shutdown() {
        let lifecycle = Lifecycle::new();
        let watcher = lifecycle.watch_signals();

        lifecycle.shutdown();

        tokio::time::timeout(Duration::from_secs(1), watcher)
            .await
            .expect("watcher should exit once the root scope is cancelled")
            .unwrap();
    }
}
