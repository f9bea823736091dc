//! The offline cache.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tether_client::{Message, Session};
use tether_config::CacheConfig;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::expiry::{is_expired, now_ms};
use crate::lru_index::LruIndex;
use crate::merge::{cap_messages, merge_messages};
use crate::model::{CachedMessages, CachedSession, SessionListMeta, SessionPatch};
use crate::stats::CacheStats;
use crate::store::{
    BlobStore, FsBlobStore, FsKvStore, KvStore, MemoryBlobStore, MemoryKvStore, blob_name,
};

const SESSION_LIST_KEY: &str = "session_list";
const SESSION_LIST_META_KEY: &str = "session_list_meta";
const LRU_ORDER_KEY: &str = "lru_order";
const CACHE_STATS_KEY: &str = "cache_stats";

/// Outcome of a maintenance sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Blobs deleted for being past their TTL.
    pub expired: usize,
    /// Blobs deleted for being unreadable.
    pub corrupt: usize,
    /// LRU entries dropped because their blob was gone.
    pub dropped_from_index: usize,
    /// Blobs found on disk but missing from the LRU order.
    pub adopted: usize,
    /// Recomputed blob total in bytes.
    pub total_size: u64,
    pub sessions_with_messages: u64,
}

/// State behind the cache lock.
struct CacheInner {
    kv: Arc<dyn KvStore>,
    blobs: Arc<dyn BlobStore>,
    /// Loaded on first use; `None` until then.
    lru: Option<LruIndex>,
    stats: Option<CacheStats>,
}

/// Offline cache of the session list and per-session messages.
///
/// Cheap to clone; clones share state. Every mutating operation holds one
/// lock for its whole read-modify-persist cycle, so concurrent calls never
/// interleave their writes.
#[derive(Clone)]
pub struct OfflineCache {
    inner: Arc<Mutex<CacheInner>>,
    config: Arc<parking_lot::RwLock<CacheConfig>>,
}

impl OfflineCache {
    /// Create a cache over the given stores.
    pub fn new(kv: Arc<dyn KvStore>, blobs: Arc<dyn BlobStore>, config: CacheConfig) -> Self {
        let inner = CacheInner {
            kv,
            blobs,
            lru: None,
            stats: None,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            config: Arc::new(parking_lot::RwLock::new(config)),
        }
    }

    /// Cache persisted under `dir` (`kv/` for records, `messages/` for blobs).
    pub fn open(dir: &Path, config: CacheConfig) -> Self {
        Self::new(
            Arc::new(FsKvStore::new(dir.join("kv"))),
            Arc::new(FsBlobStore::new(dir.join("messages"))),
            config,
        )
    }

    /// Cache that lives only as long as the process.
    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(
            Arc::new(MemoryKvStore::new()),
            Arc::new(MemoryBlobStore::new()),
            config,
        )
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> CacheConfig {
        self.config.read().clone()
    }

    /// Replace the limits applied by subsequent writes.
    pub fn set_config(&self, config: CacheConfig) {
        *self.config.write() = config;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session list
    // ─────────────────────────────────────────────────────────────────────────

    /// Stored session list, newest first, and its metadata if a list was stored.
    pub async fn get_session_list(&self) -> Result<(Vec<CachedSession>, Option<SessionListMeta>)> {
        let inner = self.inner.lock().await;
        let sessions = inner.load_list().await?;
        let meta = inner.load_record::<SessionListMeta>(SESSION_LIST_META_KEY).await?;
        Ok((sessions, meta))
    }

    /// Store a freshly fetched session list.
    ///
    /// Sorted by last update, newest first, and truncated to `max_sessions`.
    /// Entries already cached keep their `cached_at` and message bookkeeping.
    pub async fn put_session_list(&self, sessions: &[Session]) -> Result<()> {
        let config = self.config();
        let now = now_ms();
        let inner = self.inner.lock().await;

        let previous: HashMap<String, CachedSession> = inner
            .load_list()
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        let mut list: Vec<CachedSession> = sessions
            .iter()
            .map(|s| CachedSession::from_session(s, now, previous.get(&s.id)))
            .collect();
        sort_newest_first(&mut list);
        list.truncate(config.max_sessions);

        let meta = SessionListMeta {
            fetched_at: now,
            total_count: sessions.len() as u64,
            is_complete: sessions.len() <= config.max_sessions,
        };

        debug!(
            stored = list.len(),
            total = meta.total_count,
            complete = meta.is_complete,
            "Stored session list"
        );
        inner.save_record(SESSION_LIST_KEY, &list).await?;
        inner.save_record(SESSION_LIST_META_KEY, &meta).await
    }

    /// Whether the stored list is missing or older than the freshness window.
    pub async fn is_session_list_stale(&self) -> Result<bool> {
        let window = self.config().session_list_fresh();
        let inner = self.inner.lock().await;
        let meta = inner.load_record::<SessionListMeta>(SESSION_LIST_META_KEY).await?;
        Ok(meta.is_none_or(|m| is_expired(m.fetched_at, window, now_ms())))
    }

    /// Insert or replace one session in the stored list.
    pub async fn upsert_session(&self, session: &Session) -> Result<()> {
        let max_sessions = self.config().max_sessions;
        let inner = self.inner.lock().await;
        let mut list = inner.load_list().await?;

        let previous = list.iter().position(|s| s.id == session.id);
        let entry = CachedSession::from_session(
            session,
            now_ms(),
            previous.map(|index| &list[index]),
        );
        match previous {
            Some(index) => list[index] = entry,
            None => list.push(entry),
        }
        sort_newest_first(&mut list);
        list.truncate(max_sessions);

        trace!(session_id = %session.id, "Upserted session");
        inner.save_record(SESSION_LIST_KEY, &list).await
    }

    /// Apply a local edit to a stored session.
    ///
    /// Returns the entry as it was before the edit, or `None` if the session
    /// is not in the stored list.
    pub async fn patch_session(
        &self,
        session_id: &str,
        patch: &SessionPatch,
    ) -> Result<Option<CachedSession>> {
        let inner = self.inner.lock().await;
        let mut list = inner.load_list().await?;
        let Some(entry) = list.iter_mut().find(|s| s.id == session_id) else {
            return Ok(None);
        };

        let before = entry.clone();
        patch.apply(entry);
        sort_newest_first(&mut list);
        inner.save_record(SESSION_LIST_KEY, &list).await?;
        Ok(Some(before))
    }

    /// Put a previously stored entry back, replacing the current one.
    pub async fn restore_session(&self, entry: CachedSession) -> Result<()> {
        let inner = self.inner.lock().await;
        let mut list = inner.load_list().await?;
        list.retain(|s| s.id != entry.id);
        list.push(entry);
        sort_newest_first(&mut list);
        inner.save_record(SESSION_LIST_KEY, &list).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────────────────────────────────────

    /// Cached messages for a session.
    ///
    /// Counts a hit or a miss. A hit marks the session as most recently used.
    /// Expired and corrupt blobs are deleted and reported as a miss.
    pub async fn get_messages(&self, session_id: &str) -> Result<Option<CachedMessages>> {
        let ttl = self.config().message_ttl();
        let mut inner = self.inner.lock().await;
        inner.ensure_loaded().await?;

        let found = inner.read_blob(session_id).await?;
        let found = match found {
            Some(cached) if is_expired(cached.synced_at, ttl, now_ms()) => {
                debug!(session_id = %session_id, "Cached messages expired");
                inner.evict(session_id).await?;
                None
            }
            other => other,
        };

        match &found {
            Some(cached) => {
                trace!(session_id = %session_id, count = cached.messages.len(), "Cache hit");
                inner.stats_mut().record_hit();
                inner.lru_mut().touch(session_id);
            }
            None => {
                trace!(session_id = %session_id, "Cache miss");
                inner.stats_mut().record_miss();
            }
        }
        inner.persist_index().await?;
        Ok(found)
    }

    /// Read a session's messages without counting the read or touching LRU order.
    ///
    /// Expired and unreadable blobs are still dropped.
    pub async fn peek_messages(&self, session_id: &str) -> Result<Option<CachedMessages>> {
        let ttl = self.config().message_ttl();
        let mut inner = self.inner.lock().await;
        inner.ensure_loaded().await?;

        let found = match inner.read_blob(session_id).await? {
            Some(cached) if is_expired(cached.synced_at, ttl, now_ms()) => {
                inner.evict(session_id).await?;
                None
            }
            other => other,
        };
        if found.is_none() {
            inner.persist_index().await?;
        }
        Ok(found)
    }

    /// Replace a session's messages.
    ///
    /// Messages are deduplicated by ID, sorted by creation time and capped at
    /// `max_messages_per_session`, keeping the most recent. Capping clears
    /// `is_complete`. Older sessions are evicted first when the byte budget
    /// or the full-session cap would be exceeded.
    pub async fn put_messages(
        &self,
        session_id: &str,
        messages: Vec<Message>,
        is_complete: bool,
    ) -> Result<CachedMessages> {
        let config = self.config();
        let mut inner = self.inner.lock().await;
        inner.ensure_loaded().await?;

        let previous = inner.read_blob(session_id).await?;
        let messages = merge_messages(Vec::new(), messages);
        inner
            .store_messages(session_id, previous, messages, is_complete, &config)
            .await
    }

    /// Merge new messages into a session's cached history.
    ///
    /// Without an existing (unexpired) blob the result is marked incomplete.
    pub async fn append_messages(
        &self,
        session_id: &str,
        new_messages: Vec<Message>,
    ) -> Result<CachedMessages> {
        let config = self.config();
        let mut inner = self.inner.lock().await;
        inner.ensure_loaded().await?;

        let previous = inner
            .read_blob(session_id)
            .await?
            .filter(|c| !is_expired(c.synced_at, config.message_ttl(), now_ms()));
        let (existing, is_complete) = match &previous {
            Some(cached) => (cached.messages.clone(), cached.is_complete),
            None => (Vec::new(), false),
        };
        let messages = merge_messages(existing, new_messages);
        inner
            .store_messages(session_id, previous, messages, is_complete, &config)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Removal and maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Forget a session: its blob, its LRU entry and its list entry.
    pub async fn remove_session(&self, session_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_loaded().await?;
        inner.drop_blob(session_id).await?;
        inner.persist_index().await?;

        let mut list = inner.load_list().await?;
        let before = list.len();
        list.retain(|s| s.id != session_id);
        if list.len() != before {
            inner.save_record(SESSION_LIST_KEY, &list).await?;
            if let Some(mut meta) = inner
                .load_record::<SessionListMeta>(SESSION_LIST_META_KEY)
                .await?
            {
                meta.total_count = meta.total_count.saturating_sub(1);
                inner.save_record(SESSION_LIST_META_KEY, &meta).await?;
            }
        }

        debug!(session_id = %session_id, "Removed session from cache");
        Ok(())
    }

    /// Delete everything, including statistics.
    pub async fn clear_all(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for name in inner.blobs.list().await? {
            inner.blobs.delete(&name).await?;
        }
        for key in [
            SESSION_LIST_KEY,
            SESSION_LIST_META_KEY,
            LRU_ORDER_KEY,
            CACHE_STATS_KEY,
        ] {
            inner.kv.remove(key).await?;
        }
        inner.lru = Some(LruIndex::new());
        inner.stats = Some(CacheStats::default());
        debug!("Cleared offline cache");
        Ok(())
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let mut inner = self.inner.lock().await;
        inner.ensure_loaded().await?;
        Ok(inner.stats_mut().clone())
    }

    /// Session IDs holding messages, most recently used first.
    pub async fn lru_order(&self) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().await;
        inner.ensure_loaded().await?;
        Ok(inner.lru_mut().ids())
    }

    /// Delete expired and corrupt blobs and reconcile the index with what is stored.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let ttl = self.config().message_ttl();
        let now = now_ms();
        let mut inner = self.inner.lock().await;
        inner.ensure_loaded().await?;

        let mut report = SweepReport::default();
        let mut present: HashMap<String, (u64, CachedMessages)> = HashMap::new();

        for name in inner.blobs.list().await? {
            let Some(contents) = inner.blobs.read(&name).await? else {
                continue;
            };
            match serde_json::from_str::<CachedMessages>(&contents) {
                Ok(cached) if blob_name(&cached.session_id) != name => {
                    warn!(blob = %name, "Deleting blob stored under the wrong name");
                    inner.blobs.delete(&name).await?;
                    report.corrupt += 1;
                }
                Ok(cached) if is_expired(cached.synced_at, ttl, now) => {
                    inner.blobs.delete(&name).await?;
                    report.expired += 1;
                }
                Ok(cached) => {
                    present.insert(cached.session_id.clone(), (contents.len() as u64, cached));
                }
                Err(e) => {
                    warn!(blob = %name, error = %e, "Deleting corrupt blob");
                    inner.blobs.delete(&name).await?;
                    report.corrupt += 1;
                }
            }
        }

        let lru = inner.lru_mut();
        report.dropped_from_index = lru.retain(|id| present.contains_key(id));
        let mut unlisted: Vec<&String> = present.keys().filter(|id| !lru.contains(id)).collect();
        unlisted.sort();
        for id in unlisted {
            lru.push_oldest(id);
            report.adopted += 1;
        }

        report.total_size = present.values().map(|(size, _)| size).sum();
        report.sessions_with_messages = present.len() as u64;
        let stats = inner.stats_mut();
        stats.total_size = report.total_size;
        stats.sessions_with_messages = report.sessions_with_messages;
        stats.last_cleanup = Some(now);
        inner.persist_index().await?;

        let mut list = inner.load_list().await?;
        let mut changed = false;
        for entry in &mut list {
            let (full, count) = match present.get(&entry.id) {
                Some((_, cached)) => (cached.is_complete, cached.messages.len() as u64),
                None => (false, 0),
            };
            if entry.is_full_cache != full || entry.message_count != count {
                entry.is_full_cache = full;
                entry.message_count = count;
                changed = true;
            }
        }
        if changed {
            inner.save_record(SESSION_LIST_KEY, &list).await?;
        }

        debug!(
            expired = report.expired,
            corrupt = report.corrupt,
            adopted = report.adopted,
            bytes = report.total_size,
            "Cache sweep finished"
        );
        Ok(report)
    }

    /// Run [`sweep`](Self::sweep) every `sweep_interval_secs`.
    ///
    /// Returns `None` when the sweep task is disabled. The first sweep runs
    /// immediately. Abort the handle to stop.
    pub fn spawn_maintenance(&self) -> Option<JoinHandle<()>> {
        let config = self.config();
        if !config.enable_sweep_task {
            return None;
        }

        let cache = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.sweep_interval());
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = cache.sweep().await {
                    warn!(error = %e, "Cache sweep failed");
                }
            }
        }))
    }
}

fn sort_newest_first(list: &mut [CachedSession]) {
    list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

impl CacheInner {
    async fn load_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.kv.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding corrupt cache record");
                self.kv.remove(key).await?;
                Ok(None)
            }
        }
    }

    async fn save_record<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.kv.set(key, &raw).await
    }

    async fn load_list(&self) -> Result<Vec<CachedSession>> {
        Ok(self
            .load_record::<Vec<CachedSession>>(SESSION_LIST_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Load LRU order and stats from the store once per process.
    async fn ensure_loaded(&mut self) -> Result<()> {
        if self.lru.is_none() {
            let order = self
                .load_record::<Vec<String>>(LRU_ORDER_KEY)
                .await?
                .unwrap_or_default();
            self.lru = Some(LruIndex::from_order(order));
        }
        if self.stats.is_none() {
            let stats = self
                .load_record::<CacheStats>(CACHE_STATS_KEY)
                .await?
                .unwrap_or_default();
            self.stats = Some(stats);
        }
        Ok(())
    }

    fn lru_mut(&mut self) -> &mut LruIndex {
        self.lru.get_or_insert_with(LruIndex::new)
    }

    fn stats_mut(&mut self) -> &mut CacheStats {
        self.stats.get_or_insert_with(CacheStats::default)
    }

    async fn persist_index(&mut self) -> Result<()> {
        let order = self.lru_mut().ids();
        self.save_record(LRU_ORDER_KEY, &order).await?;
        let stats = self.stats_mut().clone();
        self.save_record(CACHE_STATS_KEY, &stats).await
    }

    /// Read and parse a blob without touching counters or recency.
    ///
    /// A corrupt blob is evicted and reported as absent.
    async fn read_blob(&mut self, session_id: &str) -> Result<Option<CachedMessages>> {
        let Some(raw) = self.blobs.read(&blob_name(session_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<CachedMessages>(&raw) {
            Ok(cached) if cached.session_id == session_id => Ok(Some(cached)),
            Ok(cached) => {
                warn!(
                    session_id = %session_id,
                    stored = %cached.session_id,
                    "Message blob belongs to another session"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Discarding corrupt message blob");
                self.evict(session_id).await?;
                Ok(None)
            }
        }
    }

    /// Delete a session's blob and its LRU entry, adjusting stats.
    async fn drop_blob(&mut self, session_id: &str) -> Result<Option<u64>> {
        let name = blob_name(session_id);
        let size = self.blobs.size(&name).await?;
        if let Some(size) = size {
            self.blobs.delete(&name).await?;
            self.stats_mut().blob_removed(size);
        }
        self.lru_mut().remove(session_id);
        Ok(size)
    }

    /// Drop a session's blob and clear its list entry's message bookkeeping.
    async fn evict(&mut self, session_id: &str) -> Result<()> {
        let freed = self.drop_blob(session_id).await?;
        self.mark_list_entries(&[(session_id.to_string(), false, 0)])
            .await?;
        debug!(session_id = %session_id, bytes = freed.unwrap_or(0), "Evicted cached messages");
        Ok(())
    }

    async fn mark_list_entries(&self, updates: &[(String, bool, u64)]) -> Result<()> {
        let mut list = self.load_list().await?;
        let mut changed = false;
        for (id, full, count) in updates {
            if let Some(entry) = list.iter_mut().find(|s| &s.id == id) {
                entry.is_full_cache = *full;
                entry.message_count = *count;
                changed = true;
            }
        }
        if changed {
            self.save_record(SESSION_LIST_KEY, &list).await?;
        }
        Ok(())
    }

    async fn store_messages(
        &mut self,
        session_id: &str,
        previous: Option<CachedMessages>,
        mut messages: Vec<Message>,
        is_complete: bool,
        config: &CacheConfig,
    ) -> Result<CachedMessages> {
        let now = now_ms();
        let truncated = cap_messages(&mut messages, config.max_messages_per_session);
        let cached = CachedMessages {
            session_id: session_id.to_string(),
            messages,
            cached_at: previous.as_ref().map_or(now, |p| p.cached_at.min(now)),
            synced_at: now,
            is_complete: is_complete && !truncated,
        };
        let raw = serde_json::to_string(&cached)?;
        let new_size = raw.len() as u64;

        let name = blob_name(session_id);
        let old_size = self.blobs.size(&name).await?;
        self.make_room(session_id, old_size, new_size, config).await?;

        self.blobs.write(&name, &raw).await?;
        self.stats_mut().blob_written(old_size, new_size);
        self.lru_mut().touch(session_id);
        self.persist_index().await?;
        self.mark_list_entries(&[(
            session_id.to_string(),
            cached.is_complete,
            cached.messages.len() as u64,
        )])
        .await?;

        trace!(
            session_id = %session_id,
            count = cached.messages.len(),
            bytes = new_size,
            complete = cached.is_complete,
            "Stored messages"
        );
        Ok(cached)
    }

    /// Evict least-recently-used sessions until a blob of `new_size` bytes
    /// for `session_id` fits both the byte budget and the full-session cap.
    async fn make_room(
        &mut self,
        session_id: &str,
        old_size: Option<u64>,
        new_size: u64,
        config: &CacheConfig,
    ) -> Result<()> {
        let mut evicted = HashSet::new();
        loop {
            let stats = self.stats_mut();
            let projected = stats
                .total_size
                .saturating_sub(old_size.unwrap_or(0))
                .saturating_add(new_size);
            let lru = self.lru_mut();
            let others = lru.len() - usize::from(lru.contains(session_id));

            let over_budget = projected > config.max_total_bytes;
            let over_count = others + 1 > config.max_full_sessions;
            if !over_budget && !over_count {
                break;
            }
            let Some(victim) = lru.oldest_except(session_id) else {
                break;
            };
            if !evicted.insert(victim.clone()) {
                break;
            }
            debug!(
                victim = %victim,
                projected,
                over_budget,
                over_count,
                "Making room in cache"
            );
            self.evict(&victim).await?;
        }
        Ok(())
    }
}
