//! Scrape-time entry point.
//!
//! The [`AggregatingExporter`] owns one [`SnapshotReader`] per enabled
//! deployment and concatenates their families in declaration order. It
//! only ever reads the snapshot store.

use tracing::trace;

use crate::family::MetricFamily;
use crate::mapper::SnapshotReader;
use crate::prometheus::render_prometheus;

pub const EXPORTER_INFO: &str = "cinder_exporter_info";

/// Process-level identity emitted once per scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterInfo {
    pub version: String,
    pub running_on: String,
}

impl ExporterInfo {
    pub fn new(version: impl Into<String>, running_on: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            running_on: running_on.into(),
        }
    }

    fn family(&self) -> MetricFamily {
        let mut family = MetricFamily::gauge(
            EXPORTER_INFO,
            "Openstack Cinder Prometheus exporter",
            &["version", "running_on"],
        );
        family.add_sample(vec![self.version.clone(), self.running_on.clone()], 1.0);
        family
    }
}

pub struct AggregatingExporter {
    readers: Vec<SnapshotReader>,
    info: Option<ExporterInfo>,
}

impl AggregatingExporter {
    pub fn new(readers: Vec<SnapshotReader>) -> Self {
        Self {
            readers,
            info: None,
        }
    }

    pub fn with_info(mut self, info: ExporterInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn deployments(&self) -> impl Iterator<Item = &str> {
        self.readers.iter().map(SnapshotReader::deployment)
    }

    /// Every family for one scrape: exporter info first, then each
    /// deployment in order.
    pub fn collect(&self) -> Vec<MetricFamily> {
        let mut families = Vec::new();
        if let Some(info) = &self.info {
            families.push(info.family());
        }
        for reader in &self.readers {
            families.extend(reader.collect());
        }
        trace!(families = families.len(), "scrape collected");
        families
    }

    pub fn render(&self) -> String {
        render_prometheus(&self.collect())
    }
}
