//! Domain records for a Cinder deployment snapshot.
//!
//! A [`Snapshot`] is the unit a poller publishes: either a complete view of
//! projects, volumes, services, and quota limits taken in one poll cycle, or
//! a bare `collected = false` marker. All types serialize to/from JSON so
//! file-backed stores can persist them.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// OpenStack project identifier.
pub type ProjectId = String;

// ── Snapshot ──────────────────────────────────────────────────────

/// One deployment's point-in-time state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Snapshot {
    /// Whether the poll cycle that produced this snapshot succeeded.
    pub collected: bool,
    /// Wall-clock seconds the successful poll took.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at_duration: Option<f64>,
    #[serde(default)]
    pub projects: BTreeMap<ProjectId, String>,
    #[serde(default)]
    pub volumes: Vec<VolumeRecord>,
    #[serde(default)]
    pub services: Vec<ServiceRecord>,
    #[serde(default)]
    pub limits: Vec<LimitRecord>,
}

/// Everything fetched in one successful poll cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Inventory {
    pub projects: BTreeMap<ProjectId, String>,
    pub volumes: Vec<VolumeRecord>,
    pub services: Vec<ServiceRecord>,
    pub limits: Vec<LimitRecord>,
}

impl Snapshot {
    /// Placeholder committed when a poller starts, before its first fetch.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Result of a failed poll cycle. Carries no inventory.
    pub fn failed() -> Self {
        Self::default()
    }

    /// Result of a successful poll cycle that took `elapsed`.
    pub fn collected(inventory: Inventory, elapsed: Duration) -> Self {
        Self {
            collected: true,
            collected_at_duration: Some(elapsed.as_secs_f64()),
            projects: inventory.projects,
            volumes: inventory.volumes,
            services: inventory.services,
            limits: inventory.limits,
        }
    }

    /// Project name for an id, or an empty string when the project is unknown.
    pub fn project_name(&self, project_id: &str) -> &str {
        self.projects.get(project_id).map(String::as_str).unwrap_or("")
    }
}

// ── Volumes ───────────────────────────────────────────────────────

/// A block-storage volume as seen by an admin `all_tenants` listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    /// Backend host (`os-vol-host-attr:host`).
    #[serde(default)]
    pub host: String,
    /// Owning project (`os-vol-tenant-attr:tenant_id`).
    #[serde(default)]
    pub project_id: ProjectId,
    #[serde(default)]
    pub volume_type: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub status: String,
    /// Server ids the volume is attached to, in API order.
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Size in GiB.
    pub size: u64,
}

impl VolumeRecord {
    /// Attachment server ids joined with commas (empty when detached).
    pub fn attachment_label(&self) -> String {
        self.attachments.join(",")
    }
}

// ── Services ──────────────────────────────────────────────────────

/// Liveness reported by Cinder for a service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Up,
    Down,
    #[serde(other)]
    Unknown,
}

/// One row of `os-services`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRecord {
    pub binary: String,
    pub host: String,
    /// Admin status (`enabled` / `disabled`).
    pub status: String,
    #[serde(default)]
    pub availability_zone: String,
    pub state: ServiceState,
}

impl ServiceRecord {
    pub fn is_up(&self) -> bool {
        self.state == ServiceState::Up
    }
}

// ── Limits ────────────────────────────────────────────────────────

/// Absolute quota limits for one project.
///
/// `values` keeps the upstream key order and the raw JSON values; keys whose
/// value is not a number are ignored when exporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitRecord {
    pub project_id: ProjectId,
    pub project_name: String,
    #[serde(default)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

impl LimitRecord {
    /// Numeric value for a limit key, if present and numeric.
    pub fn numeric(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Keys whose value is numeric (integer or float), in upstream order.
    pub fn numeric_keys(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|(_, v)| v.is_number())
            .map(|(k, _)| k.as_str())
    }
}
