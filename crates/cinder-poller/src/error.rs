//! Upstream API error types.

use thiserror::Error;

/// Result type alias for upstream API calls.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Any failure while talking to Keystone or Cinder.
///
/// The poller treats every variant the same way: the cycle is marked
/// failed and retried on schedule.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("service catalog error: {0}")]
    Catalog(String),

    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },
}
