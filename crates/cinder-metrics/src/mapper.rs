//! Snapshot → metric family mapping.
//!
//! [`map_snapshot`] is pure; [`SnapshotReader`] adds the store lookup and
//! degrades any read failure to `cinder_collect_status 0`.
//!
//! Gating: a snapshot with `collected = false` yields only the status
//! family, whatever else it carries.

use std::sync::Arc;

use tracing::{debug, warn};

use cinder_core::Snapshot;
use cinder_snapshot::{SnapshotError, SnapshotStore};

use crate::family::MetricFamily;

pub const COLLECT_STATUS: &str = "cinder_collect_status";
pub const COLLECT_DURATION: &str = "cinder_collect_duration_seconds";
pub const VOLUME_SIZE: &str = "cinder_volumes_size";
pub const SERVICE_STATUS: &str = "cinder_service_status";
pub const LIMIT_PREFIX: &str = "cinder_limit_";

const STACK_LABELS: &[&str] = &["stack"];

const VOLUME_LABELS: &[&str] = &[
    "stack",
    "id",
    "name",
    "created_at",
    "host",
    "project_id",
    "project_name",
    "volume_type",
    "availability_zone",
    "status",
    "attachments",
];

const SERVICE_LABELS: &[&str] = &["stack", "binary", "host", "status", "availability_zone"];

const LIMIT_LABELS: &[&str] = &["stack", "project_id", "project_name"];

/// Convert a camelCase limit key to snake_case: an underscore goes before
/// every uppercase letter except a leading one, then everything is
/// lowercased.
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Metric name for a limit key. Characters Prometheus does not allow in
/// names become underscores.
fn limit_metric_name(key: &str) -> String {
    let suffix: String = camel_to_snake(key)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{LIMIT_PREFIX}{suffix}")
}

/// The liveness gauge for a deployment.
pub fn collect_status(deployment: &str, collected: bool) -> MetricFamily {
    let mut family = MetricFamily::gauge(COLLECT_STATUS, "Cinder collect Status", STACK_LABELS);
    family.add_sample(vec![deployment.to_string()], if collected { 1.0 } else { 0.0 });
    family
}

/// Map one deployment's snapshot to its metric families.
///
/// Order: volumes, services, one family per numeric limit key, collection
/// duration, then collect status.
pub fn map_snapshot(deployment: &str, snapshot: &Snapshot) -> Vec<MetricFamily> {
    if !snapshot.collected {
        return vec![collect_status(deployment, false)];
    }

    let mut families = vec![
        volume_size(deployment, snapshot),
        service_status(deployment, snapshot),
    ];
    families.extend(limits(deployment, snapshot));

    if let Some(seconds) = snapshot.collected_at_duration {
        let mut duration = MetricFamily::gauge(
            COLLECT_DURATION,
            "Duration of the last successful Cinder collection",
            STACK_LABELS,
        );
        duration.add_sample(vec![deployment.to_string()], seconds);
        families.push(duration);
    }

    families.push(collect_status(deployment, true));
    families
}

fn volume_size(deployment: &str, snapshot: &Snapshot) -> MetricFamily {
    let mut family = MetricFamily::gauge(VOLUME_SIZE, "Cinder volumes information", VOLUME_LABELS);
    for volume in &snapshot.volumes {
        family.add_sample(
            vec![
                deployment.to_string(),
                volume.id.clone(),
                volume.name.clone(),
                volume.created_at.clone(),
                volume.host.clone(),
                volume.project_id.clone(),
                snapshot.project_name(&volume.project_id).to_string(),
                volume.volume_type.clone(),
                volume.availability_zone.clone(),
                volume.status.clone(),
                volume.attachment_label(),
            ],
            volume.size as f64,
        );
    }
    family
}

fn service_status(deployment: &str, snapshot: &Snapshot) -> MetricFamily {
    let mut family =
        MetricFamily::gauge(SERVICE_STATUS, "Cinder service status", SERVICE_LABELS);
    for service in &snapshot.services {
        family.add_sample(
            vec![
                deployment.to_string(),
                service.binary.clone(),
                service.host.clone(),
                service.status.clone(),
                service.availability_zone.clone(),
            ],
            if service.is_up() { 1.0 } else { 0.0 },
        );
    }
    family
}

fn limits(deployment: &str, snapshot: &Snapshot) -> Vec<MetricFamily> {
    // Union of numeric keys across projects, first-seen order.
    let mut keys: Vec<&str> = Vec::new();
    for record in &snapshot.limits {
        for key in record.numeric_keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    keys.into_iter()
        .map(|key| {
            let mut family =
                MetricFamily::gauge(limit_metric_name(key), "Cinder limits", LIMIT_LABELS);
            for record in &snapshot.limits {
                if let Some(value) = record.numeric(key) {
                    family.add_sample(
                        vec![
                            deployment.to_string(),
                            record.project_id.clone(),
                            record.project_name.clone(),
                        ],
                        value,
                    );
                }
            }
            family
        })
        .collect()
}

/// Reads one deployment's latest snapshot and maps it.
#[derive(Clone)]
pub struct SnapshotReader {
    deployment: String,
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotReader {
    pub fn new(deployment: impl Into<String>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            deployment: deployment.into(),
            store,
        }
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    /// Metric families for the currently visible snapshot. Never fails.
    pub fn collect(&self) -> Vec<MetricFamily> {
        match self.store.load(&self.deployment) {
            Ok(snapshot) => map_snapshot(&self.deployment, &snapshot),
            Err(SnapshotError::NotReady(_)) => {
                debug!(deployment = %self.deployment, "snapshot not ready yet");
                vec![collect_status(&self.deployment, false)]
            }
            Err(
                e @ (SnapshotError::UnknownSlot(_)
                | SnapshotError::Io { .. }
                | SnapshotError::Serialize(_)
                | SnapshotError::Deserialize(_)),
            ) => {
                warn!(deployment = %self.deployment, error = %e, "failed to read snapshot");
                vec![collect_status(&self.deployment, false)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use cinder_core::{Inventory, LimitRecord, ServiceRecord, ServiceState, VolumeRecord};
    use cinder_snapshot::{FileSnapshotStore, MemorySnapshotStore};
    use serde_json::json;

    fn limit(project_id: &str, project_name: &str, values: serde_json::Value) -> LimitRecord {
        LimitRecord {
            project_id: project_id.into(),
            project_name: project_name.into(),
            values: values.as_object().unwrap().clone(),
        }
    }

    fn alpha_snapshot() -> Snapshot {
        let mut projects = BTreeMap::new();
        projects.insert("p1".to_string(), "Team".to_string());
        Snapshot::collected(
            Inventory {
                projects,
                volumes: vec![VolumeRecord {
                    id: "v1".into(),
                    name: "data".into(),
                    created_at: "2024-01-01T00:00:00.000000".into(),
                    host: "h1@lvm#lvm".into(),
                    project_id: "p1".into(),
                    volume_type: "ssd".into(),
                    availability_zone: "nova".into(),
                    status: "available".into(),
                    attachments: Vec::new(),
                    size: 10,
                }],
                services: vec![
                    ServiceRecord {
                        binary: "cinder-volume".into(),
                        host: "h1".into(),
                        status: "enabled".into(),
                        availability_zone: "nova".into(),
                        state: ServiceState::Up,
                    },
                    ServiceRecord {
                        binary: "cinder-backup".into(),
                        host: "h2".into(),
                        status: "enabled".into(),
                        availability_zone: "nova".into(),
                        state: ServiceState::Down,
                    },
                ],
                limits: vec![limit("p1", "Team", json!({"maxTotalVolumes": 50}))],
            },
            Duration::from_millis(1500),
        )
    }

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("family {name} missing"))
    }

    #[test]
    fn camel_to_snake_examples() {
        assert_eq!(camel_to_snake("maxTotalVolumes"), "max_total_volumes");
        assert_eq!(camel_to_snake("totalVolumesUsed"), "total_volumes_used");
        assert_eq!(camel_to_snake("gigabytes"), "gigabytes");
        assert_eq!(camel_to_snake("MaxTotal"), "max_total");
    }

    #[test]
    fn collected_snapshot_maps_all_families() {
        let families = map_snapshot("alpha", &alpha_snapshot());
        let names: Vec<_> = families.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                VOLUME_SIZE,
                SERVICE_STATUS,
                "cinder_limit_max_total_volumes",
                COLLECT_DURATION,
                COLLECT_STATUS,
            ]
        );

        let status = family(&families, COLLECT_STATUS);
        assert_eq!(status.find("stack", "alpha").map(|s| s.value), Some(1.0));

        let duration = family(&families, COLLECT_DURATION);
        assert_eq!(duration.samples[0].value, 1.5);
    }

    #[test]
    fn volume_labels_and_value() {
        let families = map_snapshot("alpha", &alpha_snapshot());
        let volumes = family(&families, VOLUME_SIZE);
        let sample = volumes.find("id", "v1").unwrap();

        assert_eq!(sample.value, 10.0);
        assert_eq!(volumes.label(sample, "stack"), Some("alpha"));
        assert_eq!(volumes.label(sample, "project_name"), Some("Team"));
        assert_eq!(volumes.label(sample, "status"), Some("available"));
        assert_eq!(volumes.label(sample, "attachments"), Some(""));
        assert_eq!(volumes.labels.len(), 11);
    }

    #[test]
    fn volume_with_unknown_project_has_empty_name() {
        let mut snapshot = alpha_snapshot();
        snapshot.volumes[0].project_id = "p9".into();
        let families = map_snapshot("alpha", &snapshot);
        let volumes = family(&families, VOLUME_SIZE);
        assert_eq!(volumes.label(&volumes.samples[0], "project_name"), Some(""));
    }

    #[test]
    fn service_state_maps_to_one_or_zero() {
        let families = map_snapshot("alpha", &alpha_snapshot());
        let services = family(&families, SERVICE_STATUS);
        assert_eq!(services.find("binary", "cinder-volume").map(|s| s.value), Some(1.0));
        assert_eq!(services.find("binary", "cinder-backup").map(|s| s.value), Some(0.0));
    }

    #[test]
    fn not_collected_emits_only_status() {
        // Data left in a failed snapshot must not be served.
        let mut snapshot = alpha_snapshot();
        snapshot.collected = false;

        let families = map_snapshot("alpha", &snapshot);
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, COLLECT_STATUS);
        assert_eq!(families[0].samples[0].value, 0.0);
    }

    #[test]
    fn non_numeric_limits_are_skipped() {
        let mut snapshot = alpha_snapshot();
        snapshot.limits = vec![
            limit(
                "p1",
                "Team",
                json!({"maxTotalVolumes": 50, "maxTotalVolumeGigabytes": 1000.5, "label": "gold"}),
            ),
            limit("p2", "Ops", json!({"maxTotalVolumes": 20, "totalVolumesUsed": 3})),
        ];

        let families = map_snapshot("alpha", &snapshot);
        let limit_names: Vec<_> = families
            .iter()
            .map(|f| f.name.as_str())
            .filter(|n| n.starts_with(LIMIT_PREFIX))
            .collect();
        assert_eq!(
            limit_names,
            vec![
                "cinder_limit_max_total_volumes",
                "cinder_limit_max_total_volume_gigabytes",
                "cinder_limit_total_volumes_used",
            ]
        );

        let max_volumes = family(&families, "cinder_limit_max_total_volumes");
        assert_eq!(max_volumes.samples.len(), 2);
        assert_eq!(max_volumes.find("project_id", "p2").map(|s| s.value), Some(20.0));

        let gigabytes = family(&families, "cinder_limit_max_total_volume_gigabytes");
        assert_eq!(gigabytes.samples.len(), 1);
        assert_eq!(gigabytes.samples[0].value, 1000.5);

        assert_eq!(family(&families, "cinder_limit_total_volumes_used").samples.len(), 1);
    }

    #[test]
    fn limit_labels() {
        let families = map_snapshot("alpha", &alpha_snapshot());
        let limit = family(&families, "cinder_limit_max_total_volumes");
        assert_eq!(limit.labels, vec!["stack", "project_id", "project_name"]);
        assert_eq!(
            limit.samples[0].labels,
            vec!["alpha".to_string(), "p1".to_string(), "Team".to_string()]
        );
        assert_eq!(limit.samples[0].value, 50.0);
    }

    #[test]
    fn reader_not_ready_reports_zero() {
        let store = Arc::new(MemorySnapshotStore::new(["alpha"]));
        let reader = SnapshotReader::new("alpha", store);
        let families = reader.collect();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].samples[0].value, 0.0);
    }

    #[test]
    fn reader_corrupt_file_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::open(dir.path()).unwrap();
        std::fs::write(store.path_for("alpha"), b"garbage").unwrap();

        let reader = SnapshotReader::new("alpha", Arc::new(store));
        let families = reader.collect();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, COLLECT_STATUS);
        assert_eq!(families[0].samples[0].value, 0.0);
    }

    #[test]
    fn reader_maps_committed_snapshot() {
        let store = Arc::new(MemorySnapshotStore::new(["alpha"]));
        store.commit("alpha", &alpha_snapshot()).unwrap();
        let reader = SnapshotReader::new("alpha", store);
        assert_eq!(reader.collect().len(), 5);
    }
}
