//! Startup failures and the single-instance guard.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use cinder_core::ConfigError;
use cinder_poller::UpstreamError;
use cinder_snapshot::SnapshotError;

/// Errors that stop the process before it starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Another instance holds the pid file.
    #[error("pid file {} already exists; is another exporter running?", .0.display())]
    Conflict(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("snapshot store: {0}")]
    Store(#[from] SnapshotError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("cannot build client for deployment '{deployment}': {source}")]
    Client {
        deployment: String,
        source: UpstreamError,
    },
}

impl StartupError {
    /// Process exit code: 127 when the config file is missing, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::Config(e) => e.exit_code(),
            StartupError::Conflict(_)
            | StartupError::Io { .. }
            | StartupError::Store(_)
            | StartupError::Bind { .. }
            | StartupError::Client { .. } => 1,
        }
    }
}

/// Holds the pid file for the life of the process; dropping removes it.
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
}

impl PidLock {
    /// Create `path` exclusively and write the current pid into it.
    ///
    /// An existing file, stale or not, is a [`StartupError::Conflict`].
    pub fn acquire(path: &Path) -> Result<Self, StartupError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StartupError::Conflict(path.to_path_buf())
                } else {
                    StartupError::Io {
                        context: format!("creating pid file {}", path.display()),
                        source: e,
                    }
                }
            })?;

        // From here on the file is ours; drop the guard if the write fails.
        let lock = Self {
            path: path.to_path_buf(),
        };
        writeln!(file, "{}", std::process::id()).map_err(|e| StartupError::Io {
            context: format!("writing pid file {}", path.display()),
            source: e,
        })?;

        debug!(?path, "pid file created");
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "pid file removed"),
            Err(e) => warn!(path = ?self.path, error = %e, "failed to remove pid file"),
        }
    }
}
