//! Cache-first synchronization of sessions and messages.
//!
//! [`SyncCoordinator`] decides per call whether to serve the
//! [`OfflineCache`](tether_cache::OfflineCache), hit the backend, or both:
//!
//! - Offline: reads come from the cache only, writes fail with
//!   [`SyncError::Offline`] after applying what can be applied locally.
//! - Online: the session list is always fetched, falling back to the cache
//!   when the fetch fails. Messages younger than the freshness window are
//!   served from the cache.
//! - Writes update the cache optimistically. A failed rename is rolled back;
//!   a failed delete is not.

mod backend;
mod coordinator;
mod error;

pub use backend::SessionBackend;
pub use coordinator::{MessagesResult, SessionsResult, SyncCoordinator};
pub use error::{Result, SyncError};
