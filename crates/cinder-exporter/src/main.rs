//! cinder-exporter: Prometheus exporter for OpenStack Cinder.
//!
//! # Usage
//!
//! ```text
//! cinder-exporter -f /etc/openstack/clouds.yaml --port 9756 -s /var/cache/cinder-exporter
//! ```

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cinder_exporter::{Cli, StartupError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .init();

    match cinder_exporter::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "cinder exporter failed");
            let code = e
                .downcast_ref::<StartupError>()
                .map(StartupError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
