//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading the clouds file. All of them are fatal at
/// startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("config file {} cannot be read: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config file cannot be parsed: {0}")]
    Parse(String),

    #[error("invalid config for cloud '{cloud}': {reason}")]
    Invalid { cloud: String, reason: String },
}

impl ConfigError {
    /// Process exit code for this error: 127 when the file is missing,
    /// 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::NotFound(_) => 127,
            ConfigError::Read { .. } | ConfigError::Parse(_) | ConfigError::Invalid { .. } => 1,
        }
    }
}
