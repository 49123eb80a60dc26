//! cinder-metrics: turns published snapshots into Prometheus metrics.
//!
//! Scrapes never reach OpenStack: they read whatever the pollers last
//! published and map it to gauge families.
//!
//! # Architecture
//!
//! ```text
//! AggregatingExporter
//!   ├── cinder_exporter_info
//!   └── SnapshotReader (one per enabled deployment, declaration order)
//!       ├── SnapshotStore::load()
//!       └── map_snapshot() → Vec<MetricFamily>
//!
//! render_prometheus() → text/plain for the /metrics endpoint
//! ```

pub mod exporter;
pub mod family;
pub mod mapper;
pub mod prometheus;

pub use exporter::{AggregatingExporter, ExporterInfo};
pub use family::{MetricFamily, Sample};
pub use mapper::{camel_to_snake, map_snapshot, SnapshotReader};
pub use prometheus::{render_prometheus, CONTENT_TYPE};
