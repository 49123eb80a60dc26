//! clouds.yaml configuration parser.
//!
//! The file maps a deployment name to its OpenStack auth parameters:
//!
//! ```yaml
//! clouds:
//!   alpha:
//!     region_name: RegionOne
//!     auth_url: https://keystone.example:5000/v3
//!     username: exporter
//!     password: secret
//!     project_name: admin
//!     domain_name: Default
//!     project_domain_name: Default
//!     enabled: true
//! ```
//!
//! Declaration order is kept; it is the order deployments are exported in.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Keystone credentials and scope for one deployment.
#[derive(Clone, Deserialize, PartialEq)]
pub struct AuthConfig {
    pub region_name: String,
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    /// User domain.
    pub domain_name: String,
    pub project_domain_name: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("region_name", &self.region_name)
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("project_name", &self.project_name)
            .field("domain_name", &self.domain_name)
            .field("project_domain_name", &self.project_domain_name)
            .finish()
    }
}

/// Fully resolved settings for one monitored deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentConfig {
    pub name: String,
    pub enabled: bool,
    pub auth: AuthConfig,
    /// Sleep between poll cycles.
    pub refresh_interval: Duration,
    /// Per-request timeout for upstream API calls.
    pub request_timeout: Duration,
    /// Verify the upstream TLS certificate.
    pub verify_tls: bool,
}

/// Values applied when a cloud entry does not set its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollDefaults {
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for PollDefaults {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// All deployments declared in the clouds file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    pub deployments: Vec<DeploymentConfig>,
}

#[derive(Deserialize)]
struct CloudsFile {
    clouds: Option<serde_yaml::Mapping>,
}

#[derive(Deserialize)]
struct CloudEntry {
    #[serde(flatten)]
    auth: AuthConfig,
    #[serde(default = "default_enabled")]
    enabled: bool,
    /// Seconds.
    refresh_interval: Option<u64>,
    /// Seconds.
    timeout: Option<u64>,
    verify: Option<bool>,
}

fn default_enabled() -> bool {
    true
}

impl ExporterConfig {
    /// Load and validate a clouds file.
    pub fn load(path: &Path, defaults: PollDefaults) -> ConfigResult<Self> {
        debug!(?path, "reading clouds config");
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Self::from_yaml_str(&content, defaults)
    }

    /// Parse a clouds document already in memory.
    pub fn from_yaml_str(content: &str, defaults: PollDefaults) -> ConfigResult<Self> {
        let file: CloudsFile =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let clouds = file
            .clouds
            .ok_or_else(|| ConfigError::Parse("missing top-level `clouds` mapping".to_string()))?;
        if clouds.is_empty() {
            return Err(ConfigError::Parse("no clouds defined".to_string()));
        }

        let mut deployments = Vec::with_capacity(clouds.len());
        for (key, value) in clouds {
            let name = match key {
                serde_yaml::Value::String(s) => s,
                other => {
                    return Err(ConfigError::Parse(format!(
                        "cloud names must be strings, got {other:?}"
                    )));
                }
            };
            let deployment = parse_cloud(&name, value, defaults)?;
            if deployments
                .iter()
                .any(|d: &DeploymentConfig| d.name == deployment.name)
            {
                return Err(ConfigError::Invalid {
                    cloud: name,
                    reason: "declared more than once".to_string(),
                });
            }
            deployments.push(deployment);
        }

        Ok(Self { deployments })
    }

    /// Deployments to poll and export, in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = &DeploymentConfig> {
        self.deployments.iter().filter(|d| d.enabled)
    }
}

fn parse_cloud(
    name: &str,
    value: serde_yaml::Value,
    defaults: PollDefaults,
) -> ConfigResult<DeploymentConfig> {
    let invalid = |reason: String| ConfigError::Invalid {
        cloud: name.to_string(),
        reason,
    };

    if name.trim().is_empty() {
        return Err(invalid("cloud name is empty".to_string()));
    }

    let entry: CloudEntry = serde_yaml::from_value(value).map_err(|e| invalid(e.to_string()))?;

    let refresh_interval = entry
        .refresh_interval
        .map(Duration::from_secs)
        .unwrap_or(defaults.refresh_interval);
    if refresh_interval.is_zero() {
        return Err(invalid("refresh_interval must be positive".to_string()));
    }

    let request_timeout = entry
        .timeout
        .map(Duration::from_secs)
        .unwrap_or(defaults.request_timeout);
    if request_timeout.is_zero() {
        return Err(invalid("timeout must be positive".to_string()));
    }

    if entry.auth.auth_url.trim().is_empty() {
        return Err(invalid("auth_url is empty".to_string()));
    }

    Ok(DeploymentConfig {
        name: name.to_string(),
        enabled: entry.enabled,
        auth: entry.auth,
        refresh_interval,
        request_timeout,
        verify_tls: entry.verify.unwrap_or(true),
    })
}
