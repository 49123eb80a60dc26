//! cinder-core: shared types for the Cinder exporter.
//!
//! Holds the [`Snapshot`] record that pollers publish and the exporter
//! reads, the per-deployment configuration handed to each poller, and the
//! `clouds.yaml` loader.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AuthConfig, DeploymentConfig, ExporterConfig, PollDefaults};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
