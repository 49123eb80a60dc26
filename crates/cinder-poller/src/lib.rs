//! cinder-poller: background collection of Cinder state.
//!
//! One [`Poller`] per deployment repeatedly fetches projects, volumes,
//! services, and per-project quota limits through a [`CinderApi`] client
//! and commits the result to a
//! [`SnapshotStore`](cinder_snapshot::SnapshotStore).
//!
//! # Architecture
//!
//! ```text
//! PollerSet
//!   └── one tokio task per enabled deployment
//!       ├── commit placeholder (collected = false)
//!       └── loop
//!           ├── fetch_inventory() via CinderApi (OpenStackClient)
//!           ├── commit Snapshot (collected = true | false)
//!           └── sleep(refresh_interval) or shutdown
//! ```
//!
//! Upstream failures never leave the loop: they become a
//! `collected = false` snapshot and are retried on the next cycle.

pub mod api;
pub mod error;
pub mod openstack;
pub mod poller;

pub use api::{fetch_inventory, CinderApi, Project};
pub use error::{UpstreamError, UpstreamResult};
pub use openstack::OpenStackClient;
pub use poller::{CycleResult, Poller, PollerSet};
