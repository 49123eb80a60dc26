//! Poller: background task that refreshes one deployment's snapshot.
//!
//! [`PollerSet`] spawns a task per deployment and owns the shared shutdown
//! signal. Each task commits a placeholder, then loops: fetch, commit,
//! sleep. Nothing a single cycle does can end the loop; only shutdown does.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use cinder_core::Snapshot;
use cinder_snapshot::SnapshotStore;

use crate::api::{fetch_inventory, CinderApi};

/// What one poll cycle ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleResult {
    /// Inventory fetched and committed with `collected = true`.
    Collected,
    /// Upstream failed; a `collected = false` snapshot was committed.
    UpstreamFailed,
    /// The snapshot could not be written. The previous one stays visible.
    PersistFailed,
}

/// Polls one deployment and owns the write side of its snapshot slot.
pub struct Poller<C> {
    deployment: String,
    client: C,
    store: Arc<dyn SnapshotStore>,
    interval: Duration,
}

impl<C: CinderApi> Poller<C> {
    pub fn new(
        deployment: impl Into<String>,
        client: C,
        store: Arc<dyn SnapshotStore>,
        interval: Duration,
    ) -> Self {
        Self {
            deployment: deployment.into(),
            client,
            store,
            interval,
        }
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    /// Publish the `collected = false` placeholder so the slot is readable
    /// before the first fetch completes.
    pub fn init(&self) -> bool {
        match self.store.commit(&self.deployment, &Snapshot::pending()) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    deployment = %self.deployment,
                    error = %e,
                    "failed to write initial snapshot"
                );
                false
            }
        }
    }

    /// Run one fetch-and-commit cycle.
    pub async fn poll_once(&self) -> CycleResult {
        let started = Instant::now();

        let (snapshot, mut result) = match fetch_inventory(&self.client).await {
            Ok(inventory) => {
                let elapsed = started.elapsed();
                info!(
                    deployment = %self.deployment,
                    volumes = inventory.volumes.len(),
                    services = inventory.services.len(),
                    projects = inventory.projects.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "collection succeeded"
                );
                (Snapshot::collected(inventory, elapsed), CycleResult::Collected)
            }
            Err(e) => {
                warn!(deployment = %self.deployment, error = %e, "collection failed");
                (Snapshot::failed(), CycleResult::UpstreamFailed)
            }
        };

        if let Err(e) = self.store.commit(&self.deployment, &snapshot) {
            error!(deployment = %self.deployment, error = %e, "failed to publish snapshot");
            result = CycleResult::PersistFailed;
        }

        result
    }

    /// Poll until `shutdown` flips (or its sender is dropped).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            deployment = %self.deployment,
            interval_secs = self.interval.as_secs(),
            "poller started"
        );
        self.init();

        let mut consecutive_failures: u32 = 0;
        loop {
            tokio::select! {
                result = self.poll_once() => {
                    if result == CycleResult::Collected {
                        consecutive_failures = 0;
                    } else {
                        consecutive_failures += 1;
                        debug!(
                            deployment = %self.deployment,
                            consecutive_failures,
                            "cycle did not publish fresh data"
                        );
                    }
                }
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!(deployment = %self.deployment, "poller stopped");
    }
}

/// The set of running pollers.
pub struct PollerSet {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl Default for PollerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerSet {
    pub fn new() -> Self {
        let (shutdown_tx, _rx) = watch::channel(false);
        Self {
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    /// Start a poller on its own task.
    pub fn spawn<C: CinderApi + 'static>(&mut self, poller: Poller<C>) {
        let deployment = poller.deployment().to_string();
        let shutdown = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(poller.run(shutdown));
        self.tasks.push((deployment, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Deployment names in spawn order.
    pub fn deployments(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|(name, _)| name.as_str())
    }

    /// Signal every poller to stop and wait for them.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for (deployment, handle) in self.tasks {
            if let Err(e) = handle.await {
                error!(%deployment, error = %e, "poller task ended abnormally");
            }
        }
        info!("all pollers stopped");
    }
}
