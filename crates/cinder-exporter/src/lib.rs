//! cinder-exporter: the daemon behind the `cinder-exporter` binary.
//!
//! Startup runs in a fixed order and any failure aborts before serving:
//!
//! ```text
//! Cli ─► logging ─► PidLock ─► clouds.yaml ─► SnapshotBackend
//!     ─► bind listener ─► PollerSet (one task per enabled cloud)
//!     ─► axum /metrics until Ctrl-C / SIGTERM
//!     ─► stop pollers ─► remove snapshot files ─► drop PidLock
//! ```

pub mod app;
pub mod cli;
pub mod hostname;
pub mod http;
pub mod startup;

pub use app::{build_exporter, run, spawn_pollers, SnapshotBackend};
pub use cli::Cli;
pub use http::build_router;
pub use startup::{PidLock, StartupError};
