//! Error types for the snapshot store.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for snapshot store operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur while committing or loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Nothing has been committed for this deployment yet.
    #[error("snapshot not ready for deployment '{0}'")]
    NotReady(String),

    /// Commit to a deployment the store holds no slot for.
    #[error("no snapshot slot for deployment '{0}'")]
    UnknownSlot(String),

    #[error("snapshot I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}

impl SnapshotError {
    /// True when the slot simply has no value yet.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, SnapshotError::NotReady(_))
    }
}
