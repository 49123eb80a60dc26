//! The upstream API seam.
//!
//! [`CinderApi`] is what a poller needs from OpenStack. The production
//! implementation is [`OpenStackClient`](crate::OpenStackClient); tests
//! substitute scripted fakes.

use std::collections::BTreeMap;
use std::future::Future;

use serde::Deserialize;
use tracing::debug;

use cinder_core::{Inventory, LimitRecord, ServiceRecord, VolumeRecord};

use crate::error::UpstreamResult;

/// A Keystone project.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// Read-only view of one OpenStack deployment's block storage.
pub trait CinderApi: Send + Sync {
    /// All projects visible to the exporter's credentials.
    fn list_projects(&self) -> impl Future<Output = UpstreamResult<Vec<Project>>> + Send;

    /// All volumes across every project.
    fn list_volumes(&self) -> impl Future<Output = UpstreamResult<Vec<VolumeRecord>>> + Send;

    /// Every Cinder service (scheduler, volume, backup).
    fn list_services(&self) -> impl Future<Output = UpstreamResult<Vec<ServiceRecord>>> + Send;

    /// Absolute quota limits for one project, keyed by limit name.
    fn get_quota_limits(
        &self,
        project_id: &str,
    ) -> impl Future<Output = UpstreamResult<serde_json::Map<String, serde_json::Value>>> + Send;
}

/// Fetch a complete inventory in one pass.
///
/// Projects come first because limits are fetched per project; volumes and
/// services are fetched concurrently. Any error aborts the whole pass so a
/// partial inventory is never returned.
pub async fn fetch_inventory<C: CinderApi>(client: &C) -> UpstreamResult<Inventory> {
    let project_list = client.list_projects().await?;

    let (volumes, services) = tokio::try_join!(client.list_volumes(), client.list_services())?;

    // Limits follow the order Keystone listed the projects in.
    let mut limits = Vec::with_capacity(project_list.len());
    for project in &project_list {
        let values = client.get_quota_limits(&project.id).await?;
        limits.push(LimitRecord {
            project_id: project.id.clone(),
            project_name: project.name.clone(),
            values,
        });
    }

    let projects: BTreeMap<String, String> =
        project_list.into_iter().map(|p| (p.id, p.name)).collect();

    debug!(
        projects = projects.len(),
        volumes = volumes.len(),
        services = services.len(),
        "inventory fetched"
    );

    Ok(Inventory {
        projects,
        volumes,
        services,
        limits,
    })
}
