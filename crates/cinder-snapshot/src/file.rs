//! File-backed snapshot store.
//!
//! One JSON file per deployment under a root directory. A commit writes the
//! whole snapshot to `<file>.new` and renames it over `<file>`; the rename
//! is atomic within one filesystem, so a reader opening `<file>` gets either
//! the previous or the next snapshot in full.
//!
//! File names carry the process id so two exporters sharing a directory
//! never overwrite each other's slots.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use cinder_core::Snapshot;

use crate::error::{SnapshotError, SnapshotResult};
use crate::SnapshotStore;

const FILE_PREFIX: &str = "cinder-exporter";

/// Snapshot slots persisted as files under `root`.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    root: PathBuf,
    pid: u32,
}

impl FileSnapshotStore {
    /// Open (or create) a store rooted at `root` for the current process.
    pub fn open(root: &Path) -> SnapshotResult<Self> {
        Self::open_for_pid(root, std::process::id())
    }

    /// Open a store whose file names use `pid` instead of the current
    /// process id.
    pub fn open_for_pid(root: &Path, pid: u32) -> SnapshotResult<Self> {
        fs::create_dir_all(root).map_err(|source| SnapshotError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        debug!(?root, pid, "snapshot directory ready");
        Ok(Self {
            root: root.to_path_buf(),
            pid,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Visible snapshot file for a deployment.
    pub fn path_for(&self, deployment: &str) -> PathBuf {
        self.root.join(format!(
            "{FILE_PREFIX}.{}.{}.json",
            encode_name(deployment),
            self.pid
        ))
    }

    fn staging_path_for(&self, deployment: &str) -> PathBuf {
        let mut path = self.path_for(deployment).into_os_string();
        path.push(".new");
        PathBuf::from(path)
    }

    /// Delete a deployment's visible and staging files. Missing files are
    /// not an error.
    pub fn remove(&self, deployment: &str) -> SnapshotResult<()> {
        for path in [self.path_for(deployment), self.staging_path_for(deployment)] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(?path, "snapshot file removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(SnapshotError::Io { path, source }),
            }
        }
        Ok(())
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn commit(&self, deployment: &str, snapshot: &Snapshot) -> SnapshotResult<()> {
        let bytes =
            serde_json::to_vec(snapshot).map_err(|e| SnapshotError::Serialize(e.to_string()))?;

        let staging = self.staging_path_for(deployment);
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| SnapshotError::Io { path, source }
        };

        {
            let mut file = fs::File::create(&staging).map_err(io_err(&staging))?;
            file.write_all(&bytes).map_err(io_err(&staging))?;
            file.sync_all().map_err(io_err(&staging))?;
        }

        let visible = self.path_for(deployment);
        fs::rename(&staging, &visible).map_err(io_err(&visible))?;

        debug!(
            %deployment,
            path = ?visible,
            bytes = bytes.len(),
            collected = snapshot.collected,
            "snapshot published"
        );
        Ok(())
    }

    fn load(&self, deployment: &str) -> SnapshotResult<Arc<Snapshot>> {
        let path = self.path_for(deployment);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::NotReady(deployment.to_string()));
            }
            Err(source) => return Err(SnapshotError::Io { path, source }),
        };
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Deserialize(e.to_string()))?;
        Ok(Arc::new(snapshot))
    }
}

/// Encode a deployment name for use in a file name.
///
/// ASCII alphanumerics and `-` pass through; every other byte, `_` and `.`
/// included, becomes `_XX` (uppercase hex). Distinct names always map to
/// distinct file names.
fn encode_name(deployment: &str) -> String {
    let mut out = String::with_capacity(deployment.len());
    for byte in deployment.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("_{byte:02X}"));
        }
    }
    out
}
