//! Daemon assembly: store, pollers, exporter, server.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use cinder_core::{DeploymentConfig, ExporterConfig};
use cinder_metrics::{AggregatingExporter, ExporterInfo, SnapshotReader};
use cinder_poller::{OpenStackClient, Poller, PollerSet};
use cinder_snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};

use crate::cli::Cli;
use crate::hostname::hostname;
use crate::http::build_router;
use crate::startup::{PidLock, StartupError};

/// The snapshot store chosen at startup.
pub struct SnapshotBackend {
    store: Arc<dyn SnapshotStore>,
    files: Option<FileSnapshotStore>,
}

impl SnapshotBackend {
    /// Files under `dir` when given, otherwise one in-memory slot per
    /// deployment.
    pub fn open<'a>(
        dir: Option<&Path>,
        deployments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, StartupError> {
        match dir {
            Some(dir) => {
                let files = FileSnapshotStore::open(dir)?;
                info!(root = ?files.root(), "using file snapshot store");
                Ok(Self {
                    store: Arc::new(files.clone()),
                    files: Some(files),
                })
            }
            None => {
                info!("using in-memory snapshot store");
                Ok(Self {
                    store: Arc::new(MemorySnapshotStore::new(deployments)),
                    files: None,
                })
            }
        }
    }

    pub fn store(&self) -> Arc<dyn SnapshotStore> {
        self.store.clone()
    }

    /// Remove this process's snapshot files. No-op for the memory store.
    pub fn cleanup<'a>(&self, deployments: impl IntoIterator<Item = &'a str>) {
        let Some(files) = &self.files else {
            return;
        };
        for deployment in deployments {
            if let Err(e) = files.remove(deployment) {
                warn!(%deployment, error = %e, "failed to remove snapshot file");
            }
        }
    }
}

/// One reader per enabled deployment, in declaration order.
pub fn build_exporter(
    config: &ExporterConfig,
    store: Arc<dyn SnapshotStore>,
    info: ExporterInfo,
) -> AggregatingExporter {
    let readers = config
        .enabled()
        .map(|d| SnapshotReader::new(d.name.clone(), store.clone()))
        .collect();
    AggregatingExporter::new(readers).with_info(info)
}

fn openstack_poller(
    deployment: &DeploymentConfig,
    store: Arc<dyn SnapshotStore>,
) -> Result<Poller<OpenStackClient>, StartupError> {
    let client = OpenStackClient::new(deployment).map_err(|source| StartupError::Client {
        deployment: deployment.name.clone(),
        source,
    })?;
    Ok(Poller::new(
        deployment.name.clone(),
        client,
        store,
        deployment.refresh_interval,
    ))
}

/// Build every client first, then spawn one poller per enabled deployment.
pub fn spawn_pollers(
    config: &ExporterConfig,
    store: Arc<dyn SnapshotStore>,
) -> Result<PollerSet, StartupError> {
    let pollers = config
        .enabled()
        .map(|d| openstack_poller(d, store.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut set = PollerSet::new();
    for poller in pollers {
        set.spawn(poller);
    }
    Ok(set)
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

/// Run the exporter until a shutdown signal arrives.
///
/// Startup failures come back as [`StartupError`] inside the
/// `anyhow::Error` so the caller can pick the exit code.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "cinder exporter starting");

    let _lock = PidLock::acquire(&cli.pid_file)?;

    let config = ExporterConfig::load(&cli.cloud_config, cli.poll_defaults())
        .map_err(StartupError::from)?;
    let enabled: Vec<&str> = config.enabled().map(|d| d.name.as_str()).collect();
    info!(
        declared = config.deployments.len(),
        enabled = enabled.len(),
        "clouds config loaded"
    );

    let backend = SnapshotBackend::open(cli.snapshot_dir.as_deref(), enabled.iter().copied())?;

    let exporter = build_exporter(
        &config,
        backend.store(),
        ExporterInfo::new(env!("CARGO_PKG_VERSION"), hostname()),
    );

    let addr = cli.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    let pollers = spawn_pollers(&config, backend.store())?;
    if pollers.is_empty() {
        warn!("no enabled deployments; only exporter info will be served");
    } else {
        info!(pollers = pollers.len(), "pollers started");
    }

    info!(%addr, "metrics server listening");
    let served = axum::serve(listener, build_router(Arc::new(exporter)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    pollers.shutdown().await;
    backend.cleanup(enabled.iter().copied());

    served.context("metrics server failed")?;
    info!("cinder exporter stopped");
    Ok(())
}
