//! Command-line interface.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use cinder_core::PollDefaults;

#[derive(Debug, Parser)]
#[command(
    name = "cinder-exporter",
    version,
    about = "Prometheus exporter for OpenStack Cinder"
)]
pub struct Cli {
    /// Path to the clouds.yaml describing the deployments to poll.
    #[arg(short = 'f', long = "cloud-config")]
    pub cloud_config: PathBuf,

    /// Port to serve /metrics on.
    #[arg(short, long, default_value = "9756")]
    pub port: u16,

    /// Address to bind.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub listen: IpAddr,

    /// Seconds between poll cycles, unless a cloud sets its own.
    #[arg(short, long, default_value = "300")]
    pub refresh_interval: u64,

    /// Persist snapshots as files in this directory instead of memory.
    #[arg(short, long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Pid file guarding against a second instance.
    #[arg(long, default_value = "/var/run/cinder-exporter.pid")]
    pub pid_file: PathBuf,

    /// Enable debug logging.
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug,cinder=debug"
        } else {
            "info,cinder=info"
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }

    pub fn poll_defaults(&self) -> PollDefaults {
        PollDefaults {
            refresh_interval: Duration::from_secs(self.refresh_interval),
            ..PollDefaults::default()
        }
    }
}
