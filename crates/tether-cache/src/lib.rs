//! Offline cache for conversation sessions and their messages.
//!
//! The session list and its metadata live in a small key-value store; each
//! session's messages live in their own blob. Blobs are bounded by a total
//! byte budget, a cap on how many sessions may hold messages, a per-session
//! message cap and a TTL. Eviction follows least-recently-used order, which
//! is persisted alongside hit/miss statistics.
//!
//! ```rust,ignore
//! let cache = OfflineCache::open(&data_dir, config.cache);
//! cache.put_messages("ses_1", messages, true).await?;
//!
//! if let Some(cached) = cache.get_messages("ses_1").await? {
//!     render(&cached.messages);
//! }
//! ```

mod cache;
mod error;
mod expiry;
mod lru_index;
mod merge;
mod model;
mod stats;
mod store;

pub use cache::{OfflineCache, SweepReport};
pub use error::{CacheError, Result};
pub use expiry::{is_expired, now_ms};
pub use lru_index::LruIndex;
pub use merge::{cap_messages, merge_messages};
pub use model::{CachedMessages, CachedSession, SessionListMeta, SessionPatch};
pub use stats::CacheStats;
pub use store::{
    BlobStore, FsBlobStore, FsKvStore, KvStore, MemoryBlobStore, MemoryKvStore, blob_name,
};
