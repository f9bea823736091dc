//! Transport error types.

use std::time::Duration;

/// Why a connection attempt or an established stream failed.
///
/// Every variant except [`TransportError::Exhausted`] is retried with backoff.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent (refused, DNS, TLS).
    #[error("connection failed: {0}")]
    Connect(String),

    /// No response headers arrived within the per-attempt timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),

    /// Reading the body failed mid-stream.
    #[error("stream read failed: {0}")]
    Read(String),

    /// The server ended the body without an exit message.
    #[error("stream closed by server")]
    Closed,

    /// Retry budget spent. Requires an explicit retry.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<TransportError>,
    },
}

impl TransportError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

impl From<tether_client::Error> for TransportError {
    fn from(err: tether_client::Error) -> Self {
        match err {
            tether_client::Error::Api { status, .. } => Self::Status(status),
            tether_client::Error::NotFound(_) => Self::Status(404),
            tether_client::Error::Auth(_) => Self::Status(401),
            other => Self::Connect(other.to_string()),
        }
    }
}
