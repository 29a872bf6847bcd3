use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::platform::Update;
use crate::scope::Scope;
use crate::worker::Worker;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Messages handed to a worker
    pub dispatched: usize,
    /// Updates of any other kind
    pub ignored: usize,
}

/// Reads updates in arrival order and fans each message out to its own task.
///
/// At most `max_in_flight` workers run at once; the reader only waits when
/// that many are busy.
pub struct Dispatcher {
    worker: Arc<Worker>,
    max_in_flight: usize,
}

impl Dispatcher {
    pub fn new(worker: Arc<Worker>, max_in_flight: usize) -> Self {
        Self {
            worker,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Runs until `updates` ends or `root` is cancelled, then waits for the
    /// workers already started. Each of those is bounded by its deadline.
    pub async fn run<S>(&self, root: &Scope, mut updates: S) -> DispatchSummary
    where
        S: Stream<Item = Update> + Unpin,
    {
        let tracker = TaskTracker::new();
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let mut summary = DispatchSummary::default();

        info!("Dispatcher started (max {} in flight)", self.max_in_flight);

        loop {
            let update = match root.run(updates.next()).await {
                Ok(Some(update)) => update,
                Ok(None) => {
                    info!("Update stream ended");
                    break;
                }
                Err(_) => {
                    info!("Dispatcher stopping: shutdown requested");
                    break;
                }
            };

            match update {
                Update::MessageCreated(msg) => {
                    let permit = match root.run(permits.clone().acquire_owned()).await {
                        Ok(Ok(permit)) => permit,
                        _ => break,
                    };
                    summary.dispatched += 1;

                    let worker = self.worker.clone();
                    let scope = root.clone();
                    tracker.spawn(async move {
                        let outcome = worker.handle_message(&scope, msg).await;
                        debug!("Worker finished: {:?}", outcome);
                        drop(permit);
                    });
                }
                Update::Other(tag) => {
                    summary.ignored += 1;
                    info!("Ignoring update of type {}", tag);
                }
            }
        }

        tracker.close();
        if !tracker.is_empty() {
            info!("Waiting for {} in-flight message(s)", tracker.len());
        }
        tracker.wait().await;

        info!(
            "Dispatcher stopped: {} message(s) dispatched, {} update(s) ignored",
            summary.dispatched, summary.ignored
        );
        summary
    }
}
