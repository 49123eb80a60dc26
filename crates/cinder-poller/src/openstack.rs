//! OpenStack client for Keystone v3 and the Cinder v3 API.
//!
//! Authenticates with a password against Keystone, resolves the identity
//! and block-storage endpoints from the returned service catalog, and
//! issues the admin reads a poll cycle needs. The token is reused across
//! cycles until shortly before Keystone's `expires_at` (or 50 minutes when
//! the response carries none). A request rejected with 401 re-authenticates
//! and is retried once.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use cinder_core::{AuthConfig, DeploymentConfig, ServiceRecord, ServiceState, VolumeRecord};

use crate::api::{CinderApi, Project};
use crate::error::{UpstreamError, UpstreamResult};

/// Upper bound on token reuse, and the lifetime assumed without `expires_at`.
const SESSION_MAX_AGE: Duration = Duration::from_secs(50 * 60);

/// Re-authenticate this long before Keystone's stated expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Catalog service types for block storage, most preferred first.
const VOLUME_SERVICE_TYPES: &[&str] = &["block-storage", "volumev3", "volume"];

#[derive(Debug, Clone)]
struct Session {
    token: String,
    identity_url: String,
    volume_url: String,
    obtained: Instant,
    valid_for: Duration,
}

impl Session {
    fn is_fresh(&self) -> bool {
        self.obtained.elapsed() < self.valid_for
    }
}

/// How long a token may be reused, given its `expires_at` as of `now`.
fn token_lifetime(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    match expires_at {
        Some(expires_at) => (expires_at - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .saturating_sub(EXPIRY_MARGIN)
            .min(SESSION_MAX_AGE),
        None => SESSION_MAX_AGE,
    }
}

/// [`CinderApi`] implementation over HTTPS.
pub struct OpenStackClient {
    deployment: String,
    auth: AuthConfig,
    http: reqwest::Client,
    session: Mutex<Option<Session>>,
}

impl OpenStackClient {
    /// Build a client for one deployment. No request is made until the
    /// first API call.
    pub fn new(config: &DeploymentConfig) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .user_agent(concat!("cinder-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            deployment: config.name.clone(),
            auth: config.auth.clone(),
            http,
            session: Mutex::new(None),
        })
    }

    /// Return a live session, authenticating if there is none or it is stale.
    async fn session(&self) -> UpstreamResult<Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            if session.is_fresh() {
                return Ok(session.clone());
            }
            debug!(deployment = %self.deployment, "keystone token expired, re-authenticating");
        }
        let session = self.authenticate().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }

    async fn authenticate(&self) -> UpstreamResult<Session> {
        let url = format!("{}/auth/tokens", identity_base(&self.auth.auth_url));
        let body = json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.auth.username,
                            "domain": { "name": self.auth.domain_name },
                            "password": self.auth.password,
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": self.auth.project_name,
                        "domain": { "name": self.auth.project_domain_name },
                    }
                }
            }
        });

        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Auth(format!("keystone returned {status}")));
        }

        let token = resp
            .headers()
            .get("x-subject-token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| UpstreamError::Auth("response has no X-Subject-Token".to_string()))?;

        let body: TokenResponse = resp.json().await.map_err(|e| UpstreamError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let valid_for = token_lifetime(body.token.expires_at, Utc::now());
        let catalog = body.token.catalog;
        let region = self.auth.region_name.as_str();

        let identity_url = find_endpoint(&catalog, &["identity"], region)
            .map(|u| identity_base(&u))
            .unwrap_or_else(|| identity_base(&self.auth.auth_url));
        let volume_url = find_endpoint(&catalog, VOLUME_SERVICE_TYPES, region)
            .map(|u| u.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                UpstreamError::Catalog(format!(
                    "no public block-storage endpoint in region {region}"
                ))
            })?;

        info!(
            deployment = %self.deployment,
            %identity_url,
            %volume_url,
            valid_for_secs = valid_for.as_secs(),
            "authenticated against keystone"
        );

        Ok(Session {
            token,
            identity_url,
            volume_url,
            obtained: Instant::now(),
            valid_for,
        })
    }

    /// GET the URL `url_for` builds from the current session.
    ///
    /// A 401 drops the session; the request is then retried once with a
    /// fresh token.
    async fn get_json<T, F>(&self, url_for: F) -> UpstreamResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&Session) -> String,
    {
        let mut retried = false;
        loop {
            let session = self.session().await?;
            let url = url_for(&session);
            let resp = self
                .http
                .get(&url)
                .header("X-Auth-Token", &session.token)
                .header("Accept", "application/json")
                .send()
                .await?;

            let status = resp.status();
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_session().await;
                if retried {
                    return Err(UpstreamError::Auth(format!("token rejected by {url}")));
                }
                debug!(deployment = %self.deployment, %url, "token rejected, re-authenticating");
                retried = true;
                continue;
            }
            return Self::decode(resp, &url).await;
        }
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> UpstreamResult<T> {
        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.json::<T>().await.map_err(|e| UpstreamError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl CinderApi for OpenStackClient {
    async fn list_projects(&self) -> UpstreamResult<Vec<Project>> {
        let mut page: ProjectPage = self
            .get_json(|s| format!("{}/projects", s.identity_url))
            .await?;
        let mut projects = std::mem::take(&mut page.projects);
        while let Some(next) = page.links.take().and_then(|l| l.next) {
            page = self.get_json(|_| next.clone()).await?;
            projects.append(&mut page.projects);
        }
        Ok(projects)
    }

    async fn list_volumes(&self) -> UpstreamResult<Vec<VolumeRecord>> {
        let mut page: VolumePage = self
            .get_json(|s| format!("{}/volumes/detail?all_tenants=1", s.volume_url))
            .await?;
        let mut volumes = Vec::new();
        loop {
            volumes.extend(page.volumes.drain(..).map(ApiVolume::into_record));
            let next = page
                .volumes_links
                .drain(..)
                .find(|l| l.rel == "next")
                .map(|l| l.href);
            match next {
                Some(next) => page = self.get_json(|_| next.clone()).await?,
                None => break,
            }
        }
        Ok(volumes)
    }

    async fn list_services(&self) -> UpstreamResult<Vec<ServiceRecord>> {
        let list: ServiceList = self
            .get_json(|s| format!("{}/os-services", s.volume_url))
            .await?;
        Ok(list.services.into_iter().map(ApiService::into_record).collect())
    }

    async fn get_quota_limits(
        &self,
        project_id: &str,
    ) -> UpstreamResult<serde_json::Map<String, serde_json::Value>> {
        let resp: LimitsResponse = self
            .get_json(|s| format!("{}/limits?project_id={project_id}", s.volume_url))
            .await?;
        Ok(resp.limits.absolute)
    }
}

/// Normalise a Keystone URL to its `/v3` base.
fn identity_base(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("/v3") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v3")
    }
}

/// Find the public endpoint for the first matching service type in `region`.
fn find_endpoint(catalog: &[CatalogEntry], kinds: &[&str], region: &str) -> Option<String> {
    kinds.iter().find_map(|kind| {
        catalog
            .iter()
            .filter(|entry| entry.kind == *kind)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|ep| {
                ep.interface == "public"
                    && (ep.region.as_deref() == Some(region)
                        || ep.region_id.as_deref() == Some(region))
            })
            .map(|ep| ep.url.clone())
    })
}

// ── Wire types ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Deserialize)]
struct TokenBody {
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    interface: String,
    url: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    region_id: Option<String>,
}

#[derive(Deserialize)]
struct ProjectPage {
    projects: Vec<Project>,
    #[serde(default)]
    links: Option<PageLinks>,
}

#[derive(Deserialize)]
struct PageLinks {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct VolumePage {
    volumes: Vec<ApiVolume>,
    #[serde(default)]
    volumes_links: Vec<Link>,
}

#[derive(Deserialize)]
struct Link {
    rel: String,
    href: String,
}

#[derive(Deserialize)]
struct ApiVolume {
    id: String,
    name: Option<String>,
    created_at: Option<String>,
    #[serde(rename = "os-vol-host-attr:host")]
    host: Option<String>,
    #[serde(rename = "os-vol-tenant-attr:tenant_id")]
    tenant_id: Option<String>,
    volume_type: Option<String>,
    availability_zone: Option<String>,
    status: Option<String>,
    #[serde(default)]
    attachments: Vec<ApiAttachment>,
    size: u64,
}

#[derive(Deserialize)]
struct ApiAttachment {
    server_id: Option<String>,
}

impl ApiVolume {
    fn into_record(self) -> VolumeRecord {
        VolumeRecord {
            id: self.id,
            name: self.name.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_default(),
            host: self.host.unwrap_or_default(),
            project_id: self.tenant_id.unwrap_or_default(),
            volume_type: self.volume_type.unwrap_or_default(),
            availability_zone: self.availability_zone.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            attachments: self
                .attachments
                .into_iter()
                .filter_map(|a| a.server_id)
                .collect(),
            size: self.size,
        }
    }
}

#[derive(Deserialize)]
struct ServiceList {
    services: Vec<ApiService>,
}

#[derive(Deserialize)]
struct ApiService {
    binary: String,
    host: String,
    #[serde(default)]
    zone: Option<String>,
    status: String,
    state: ServiceState,
}

impl ApiService {
    fn into_record(self) -> ServiceRecord {
        ServiceRecord {
            binary: self.binary,
            host: self.host,
            status: self.status,
            availability_zone: self.zone.unwrap_or_default(),
            state: self.state,
        }
    }
}

#[derive(Deserialize)]
struct LimitsResponse {
    limits: AbsoluteLimits,
}

#[derive(Deserialize)]
struct AbsoluteLimits {
    absolute: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode as HttpStatus};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::Arc;

    use cinder_core::PollDefaults;

    #[test]
    fn identity_base_appends_v3() {
        assert_eq!(identity_base("https://ks:5000"), "https://ks:5000/v3");
        assert_eq!(identity_base("https://ks:5000/"), "https://ks:5000/v3");
        assert_eq!(identity_base("https://ks:5000/v3/"), "https://ks:5000/v3");
    }

    fn catalog() -> Vec<CatalogEntry> {
        serde_json::from_value(json!([
            {
                "type": "identity",
                "endpoints": [
                    {"interface": "public", "region": "RegionOne", "url": "https://ks:5000"},
                    {"interface": "internal", "region": "RegionOne", "url": "http://ks-int:5000"}
                ]
            },
            {
                "type": "volumev3",
                "endpoints": [
                    {
                        "interface": "public",
                        "region_id": "RegionTwo",
                        "url": "https://cinder-2:8776/v3/abc"
                    },
                    {
                        "interface": "public",
                        "region_id": "RegionOne",
                        "url": "https://cinder-1:8776/v3/abc"
                    }
                ]
            }
        ]))
        .unwrap()
    }

    #[test]
    fn find_endpoint_matches_region_and_interface() {
        let catalog = catalog();
        assert_eq!(
            find_endpoint(&catalog, VOLUME_SERVICE_TYPES, "RegionOne").as_deref(),
            Some("https://cinder-1:8776/v3/abc")
        );
        assert_eq!(
            find_endpoint(&catalog, VOLUME_SERVICE_TYPES, "RegionTwo").as_deref(),
            Some("https://cinder-2:8776/v3/abc")
        );
        assert_eq!(
            find_endpoint(&catalog, &["identity"], "RegionOne").as_deref(),
            Some("https://ks:5000")
        );
        assert!(find_endpoint(&catalog, VOLUME_SERVICE_TYPES, "RegionThree").is_none());
    }

    #[test]
    fn volume_wire_format_maps_to_record() {
        let volume: ApiVolume = serde_json::from_value(json!({
            "id": "v1",
            "name": null,
            "created_at": "2024-01-01T00:00:00.000000",
            "os-vol-host-attr:host": "h1@lvm#lvm",
            "os-vol-tenant-attr:tenant_id": "p1",
            "volume_type": "ssd",
            "availability_zone": "nova",
            "status": "in-use",
            "attachments": [{"server_id": "s1"}, {"server_id": "s2"}],
            "size": 10
        }))
        .unwrap();
        let record = volume.into_record();
        assert_eq!(record.name, "");
        assert_eq!(record.host, "h1@lvm#lvm");
        assert_eq!(record.project_id, "p1");
        assert_eq!(record.attachments, vec!["s1", "s2"]);
        assert_eq!(record.size, 10);
    }

    #[test]
    fn service_wire_format_maps_to_record() {
        let service: ApiService = serde_json::from_value(json!({
            "binary": "cinder-volume",
            "host": "h1@lvm",
            "zone": "nova",
            "status": "enabled",
            "state": "down",
            "updated_at": "2024-01-01T00:00:00.000000"
        }))
        .unwrap();
        let record = service.into_record();
        assert_eq!(record.availability_zone, "nova");
        assert_eq!(record.state, ServiceState::Down);
    }

    #[test]
    fn token_lifetime_follows_expires_at() {
        let now = Utc::now();
        assert_eq!(token_lifetime(None, now), SESSION_MAX_AGE);
        assert_eq!(
            token_lifetime(Some(now + chrono::Duration::minutes(10)), now),
            Duration::from_secs(9 * 60)
        );
        assert_eq!(
            token_lifetime(Some(now + chrono::Duration::hours(24)), now),
            SESSION_MAX_AGE
        );
        assert_eq!(token_lifetime(Some(now + chrono::Duration::seconds(30)), now), Duration::ZERO);
        assert_eq!(token_lifetime(Some(now - chrono::Duration::hours(1)), now), Duration::ZERO);
    }

    // ── Fake Keystone + Cinder over plain HTTP ──────────────────────

    #[derive(Default)]
    struct Tokens {
        issued: u32,
        current: Option<String>,
    }

    #[derive(Clone)]
    struct FakeCloud {
        base: String,
        /// Lifetime stamped into `expires_at`; `None` omits the field.
        token_ttl: Option<chrono::Duration>,
        tokens: Arc<std::sync::Mutex<Tokens>>,
    }

    impl FakeCloud {
        fn issued(&self) -> u32 {
            self.tokens.lock().unwrap().issued
        }

        /// Invalidate the current token server-side.
        fn revoke(&self) {
            self.tokens.lock().unwrap().current = None;
        }

        fn authorized(&self, headers: &HeaderMap) -> bool {
            let presented = headers.get("x-auth-token").and_then(|v| v.to_str().ok());
            let tokens = self.tokens.lock().unwrap();
            presented.is_some() && presented == tokens.current.as_deref()
        }
    }

    async fn issue_token(
        State(cloud): State<FakeCloud>,
        Json(body): Json<serde_json::Value>,
    ) -> impl IntoResponse {
        let user = &body["auth"]["identity"]["password"]["user"];
        if user["password"] != "s3cret" {
            return (HttpStatus::UNAUTHORIZED, HeaderMap::new(), Json(json!({}))).into_response();
        }
        let token = {
            let mut tokens = cloud.tokens.lock().unwrap();
            tokens.issued += 1;
            let token = format!("tok-{}", tokens.issued);
            tokens.current = Some(token.clone());
            token
        };
        let mut headers = HeaderMap::new();
        headers.insert("x-subject-token", token.parse().unwrap());
        let mut body = json!({"token": {"catalog": [
            {"type": "identity", "endpoints": [
                {
                    "interface": "public",
                    "region": "RegionOne",
                    "url": format!("{}/identity", cloud.base)
                }
            ]},
            {"type": "volumev3", "endpoints": [
                {
                    "interface": "public",
                    "region": "RegionOne",
                    "url": format!("{}/cinder/v3/admin", cloud.base)
                }
            ]}
        ]}});
        if let Some(ttl) = cloud.token_ttl {
            body["token"]["expires_at"] = json!((Utc::now() + ttl).to_rfc3339());
        }
        (HttpStatus::CREATED, headers, Json(body)).into_response()
    }

    async fn projects(State(cloud): State<FakeCloud>, headers: HeaderMap) -> impl IntoResponse {
        if !cloud.authorized(&headers) {
            return HttpStatus::UNAUTHORIZED.into_response();
        }
        Json(json!({
            "projects": [{"id": "p1", "name": "Team"}],
            "links": {"next": null}
        }))
        .into_response()
    }

    async fn volumes(
        State(cloud): State<FakeCloud>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        if !cloud.authorized(&headers) {
            return HttpStatus::UNAUTHORIZED.into_response();
        }
        let volume = |id: &str| {
            json!({
                "id": id, "name": id, "created_at": "2024-01-01T00:00:00.000000",
                "os-vol-host-attr:host": "h1", "os-vol-tenant-attr:tenant_id": "p1",
                "volume_type": "ssd", "availability_zone": "nova", "status": "available",
                "attachments": [], "size": 10
            })
        };
        if query.get("marker").map(String::as_str) == Some("v1") {
            Json(json!({"volumes": [volume("v2")]})).into_response()
        } else {
            let next = format!(
                "{}/cinder/v3/admin/volumes/detail?all_tenants=1&marker=v1",
                cloud.base
            );
            Json(json!({
                "volumes": [volume("v1")],
                "volumes_links": [{"rel": "next", "href": next}]
            }))
            .into_response()
        }
    }

    async fn services(State(cloud): State<FakeCloud>, headers: HeaderMap) -> impl IntoResponse {
        if !cloud.authorized(&headers) {
            return HttpStatus::UNAUTHORIZED.into_response();
        }
        Json(json!({"services": [{
            "binary": "cinder-volume",
            "host": "h1",
            "zone": "nova",
            "status": "enabled",
            "state": "up"
        }]}))
        .into_response()
    }

    async fn limits(
        State(cloud): State<FakeCloud>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        if !cloud.authorized(&headers) {
            return HttpStatus::UNAUTHORIZED.into_response();
        }
        assert_eq!(query.get("project_id").map(String::as_str), Some("p1"));
        Json(json!({"limits": {
            "rate": [],
            "absolute": {"maxTotalVolumes": 50, "totalVolumesUsed": 1}
        }}))
        .into_response()
    }

    async fn spawn_fake_cloud_with(token_ttl: Option<chrono::Duration>) -> FakeCloud {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let cloud = FakeCloud {
            base: format!("http://{}", listener.local_addr().unwrap()),
            token_ttl,
            tokens: Arc::default(),
        };
        let router = Router::new()
            .route("/identity/v3/auth/tokens", post(issue_token))
            .route("/identity/v3/projects", get(projects))
            .route("/cinder/v3/admin/volumes/detail", get(volumes))
            .route("/cinder/v3/admin/os-services", get(services))
            .route("/cinder/v3/admin/limits", get(limits))
            .with_state(cloud.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        cloud
    }

    async fn spawn_fake_cloud() -> FakeCloud {
        spawn_fake_cloud_with(Some(chrono::Duration::hours(1))).await
    }

    fn deployment(base: &str, password: &str) -> DeploymentConfig {
        let defaults = PollDefaults::default();
        DeploymentConfig {
            name: "alpha".into(),
            enabled: true,
            auth: AuthConfig {
                region_name: "RegionOne".into(),
                auth_url: format!("{base}/identity"),
                username: "exporter".into(),
                password: password.into(),
                project_name: "admin".into(),
                domain_name: "Default".into(),
                project_domain_name: "Default".into(),
            },
            refresh_interval: defaults.refresh_interval,
            request_timeout: Duration::from_secs(5),
            verify_tls: true,
        }
    }

    #[tokio::test]
    async fn client_reads_fake_cloud() {
        let cloud = spawn_fake_cloud().await;
        let client = OpenStackClient::new(&deployment(&cloud.base, "s3cret")).unwrap();

        let projects = client.list_projects().await.unwrap();
        assert_eq!(projects, vec![Project { id: "p1".into(), name: "Team".into() }]);

        let volumes = client.list_volumes().await.unwrap();
        let ids: Vec<_> = volumes.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2"]);

        let services = client.list_services().await.unwrap();
        assert_eq!(services.len(), 1);
        assert!(services[0].is_up());

        let limits = client.get_quota_limits("p1").await.unwrap();
        assert_eq!(limits.get("maxTotalVolumes"), Some(&json!(50)));

        // One token serves the whole cycle.
        assert_eq!(cloud.issued(), 1);
    }

    #[tokio::test]
    async fn rejected_token_reauthenticates_and_retries() {
        let cloud = spawn_fake_cloud().await;
        let client = OpenStackClient::new(&deployment(&cloud.base, "s3cret")).unwrap();

        client.list_services().await.unwrap();
        assert_eq!(cloud.issued(), 1);

        cloud.revoke();
        let projects = client.list_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(cloud.issued(), 2);

        // The fresh token is kept for later calls.
        client.get_quota_limits("p1").await.unwrap();
        assert_eq!(cloud.issued(), 2);
    }

    #[tokio::test]
    async fn expiring_token_is_replaced_before_use() {
        // Keystone says the token dies within the refresh margin.
        let cloud = spawn_fake_cloud_with(Some(chrono::Duration::seconds(30))).await;
        let client = OpenStackClient::new(&deployment(&cloud.base, "s3cret")).unwrap();

        client.list_services().await.unwrap();
        client.list_services().await.unwrap();
        assert_eq!(cloud.issued(), 2);
    }

    #[tokio::test]
    async fn missing_expiry_reuses_token() {
        let cloud = spawn_fake_cloud_with(None).await;
        let client = OpenStackClient::new(&deployment(&cloud.base, "s3cret")).unwrap();

        client.list_services().await.unwrap();
        client.list_services().await.unwrap();
        assert_eq!(cloud.issued(), 1);
    }

    #[tokio::test]
    async fn bad_password_is_auth_error() {
        let cloud = spawn_fake_cloud().await;
        let client = OpenStackClient::new(&deployment(&cloud.base, "wrong")).unwrap();
        let err = client.list_projects().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Auth(_)), "got {err:?}");
        assert_eq!(cloud.issued(), 0);
    }

    #[tokio::test]
    async fn unreachable_keystone_is_http_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = OpenStackClient::new(&deployment(&base, "s3cret")).unwrap();
        let err = client.list_services().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Http(_)), "got {err:?}");
    }
}
