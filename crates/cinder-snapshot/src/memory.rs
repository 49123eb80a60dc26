//! In-process snapshot store for when pollers and the exporter share a
//! process.
//!
//! Each deployment gets a `tokio::sync::watch` channel holding an
//! `Option<Arc<Snapshot>>`. A commit builds a fresh `Arc` and swaps it in
//! with `send_replace`; a load clones the current `Arc`. Readers never see a
//! value under construction because the value is complete before the swap.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use cinder_core::Snapshot;

use crate::error::{SnapshotError, SnapshotResult};
use crate::SnapshotStore;

type Slot = watch::Sender<Option<Arc<Snapshot>>>;

/// Snapshot slots kept in memory, one per deployment.
///
/// The set of deployments is fixed at construction, so the slot map itself
/// is never mutated and needs no lock.
pub struct MemorySnapshotStore {
    slots: HashMap<String, Slot>,
}

impl MemorySnapshotStore {
    /// Create empty slots for the given deployments.
    pub fn new<I, S>(deployments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = deployments
            .into_iter()
            .map(|name| {
                let (tx, _rx) = watch::channel(None);
                (name.into(), tx)
            })
            .collect();
        Self { slots }
    }

    /// Subscribe to commits for a deployment. Each commit marks the
    /// receiver as changed.
    pub fn subscribe(&self, deployment: &str) -> Option<watch::Receiver<Option<Arc<Snapshot>>>> {
        self.slots.get(deployment).map(watch::Sender::subscribe)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn commit(&self, deployment: &str, snapshot: &Snapshot) -> SnapshotResult<()> {
        let slot = self
            .slots
            .get(deployment)
            .ok_or_else(|| SnapshotError::UnknownSlot(deployment.to_string()))?;
        slot.send_replace(Some(Arc::new(snapshot.clone())));
        debug!(%deployment, collected = snapshot.collected, "snapshot published");
        Ok(())
    }

    fn load(&self, deployment: &str) -> SnapshotResult<Arc<Snapshot>> {
        self.slots
            .get(deployment)
            .and_then(|slot| slot.borrow().clone())
            .ok_or_else(|| SnapshotError::NotReady(deployment.to_string()))
    }
}
