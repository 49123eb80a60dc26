//! cinder-snapshot: the atomic publish point between pollers and scrapes.
//!
//! Each deployment owns one slot. A poller replaces the slot's value
//! wholesale with [`SnapshotStore::commit`]; any number of readers call
//! [`SnapshotStore::load`] concurrently and always get one complete
//! [`Snapshot`](cinder_core::Snapshot), either the one before a commit or the
//! one after it.
//!
//! # Backends
//!
//! ```text
//! MemorySnapshotStore
//!   └── one watch channel per deployment, send_replace(Arc<Snapshot>)
//!
//! FileSnapshotStore
//!   └── <dir>/cinder-exporter.<deployment>.<pid>.json
//!       write <file>.new, then rename over <file>
//! ```
//!
//! Neither backend takes a lock that spans a poll cycle: a commit only
//! swaps a finished value into place.

pub mod error;
pub mod file;
pub mod memory;

use std::sync::Arc;

use cinder_core::Snapshot;

pub use error::{SnapshotError, SnapshotResult};
pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

/// Holder of the latest published snapshot for each deployment.
pub trait SnapshotStore: Send + Sync {
    /// Replace the visible snapshot for `deployment` in one step.
    fn commit(&self, deployment: &str, snapshot: &Snapshot) -> SnapshotResult<()>;

    /// Return the currently visible snapshot for `deployment`.
    ///
    /// Fails with [`SnapshotError::NotReady`] before the first commit.
    fn load(&self, deployment: &str) -> SnapshotResult<Arc<Snapshot>>;
}
