//! Sync error types.

use tether_cache::CacheError;

/// Error type for sync operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The backend call failed and no cached data could stand in.
    #[error(transparent)]
    Client(#[from] tether_client::Error),

    /// Reading or writing the offline cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A write was attempted while the network is unavailable.
    #[error("Network unavailable")]
    Offline,
}

impl SyncError {
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
