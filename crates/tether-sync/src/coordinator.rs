//! Read and write policy between the cache and the backend.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tether_cache::{CachedMessages, CachedSession, OfflineCache, SessionPatch, is_expired, now_ms};
use tether_client::{
    CreateSessionRequest, Message, NetworkMonitor, Session, TetherClient, UpdateSessionRequest,
};
use tether_config::SyncConfig;
use tracing::{debug, warn};

use crate::backend::SessionBackend;
use crate::error::{Result, SyncError};

/// Session list plus where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct SessionsResult {
    /// Newest first.
    pub sessions: Vec<CachedSession>,
    pub from_cache: bool,
    /// The list may be out of date: the fetch failed or was skipped while offline.
    pub stale: bool,
}

/// Message history plus where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesResult {
    /// Ascending by creation time.
    pub messages: Vec<Message>,
    pub from_cache: bool,
    /// The history is known to be complete.
    pub is_complete: bool,
}

impl MessagesResult {
    fn cached(cached: CachedMessages) -> Self {
        Self {
            messages: cached.messages,
            from_cache: true,
            is_complete: cached.is_complete,
        }
    }
}

/// Coordinates reads and writes between [`OfflineCache`] and a [`SessionBackend`].
pub struct SyncCoordinator<B: SessionBackend = TetherClient> {
    backend: B,
    cache: OfflineCache,
    network: NetworkMonitor,
    config: Arc<RwLock<SyncConfig>>,
}

impl<B: SessionBackend> SyncCoordinator<B> {
    pub fn new(backend: B, cache: OfflineCache, network: NetworkMonitor, config: SyncConfig) -> Self {
        Self {
            backend,
            cache,
            network,
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn cache(&self) -> &OfflineCache {
        &self.cache
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> SyncConfig {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: SyncConfig) {
        *self.config.write() = config;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Session list, fetched when online and served from the cache otherwise.
    pub async fn fetch_sessions(&self) -> Result<SessionsResult> {
        if self.network.is_offline() {
            let (sessions, _) = self.cache.get_session_list().await?;
            let stale = self.cache.is_session_list_stale().await?;
            debug!(count = sessions.len(), "Offline, serving cached session list");
            return Ok(SessionsResult {
                sessions,
                from_cache: true,
                stale,
            });
        }

        match self.backend.list_sessions().await {
            Ok(fetched) => {
                let sessions = match self.cache.put_session_list(&fetched).await {
                    Ok(()) => self.cache.get_session_list().await?.0,
                    Err(e) => {
                        warn!(error = %e, "Failed to cache session list");
                        uncached_list(&fetched)
                    }
                };
                Ok(SessionsResult {
                    sessions,
                    from_cache: false,
                    stale: false,
                })
            }
            Err(e) => {
                let (sessions, meta) = self.cache.get_session_list().await?;
                if meta.is_none() {
                    return Err(e.into());
                }
                warn!(error = %e, count = sessions.len(), "Session fetch failed, serving cache");
                Ok(SessionsResult {
                    sessions,
                    from_cache: true,
                    stale: true,
                })
            }
        }
    }

    /// Messages of one session.
    ///
    /// A cached copy younger than `messages_fresh_secs` is served without a
    /// round-trip unless `force_refresh` is set.
    pub async fn fetch_messages(
        &self,
        session_id: &str,
        force_refresh: bool,
    ) -> Result<MessagesResult> {
        if self.network.is_offline() {
            let cached = self.cached_messages(session_id).await;
            debug!(session_id = %session_id, hit = cached.is_some(), "Offline, serving cached messages");
            return Ok(cached.map(MessagesResult::cached).unwrap_or(MessagesResult {
                messages: Vec::new(),
                from_cache: true,
                is_complete: false,
            }));
        }

        if !force_refresh {
            let fresh_window = self.config().messages_fresh();
            let fresh = self
                .peeked_messages(session_id)
                .await
                .is_some_and(|cached| !is_expired(cached.synced_at, fresh_window, now_ms()));
            if fresh && let Some(cached) = self.cached_messages(session_id).await {
                debug!(session_id = %session_id, "Serving fresh cached messages");
                return Ok(MessagesResult::cached(cached));
            }
        }

        match self.backend.list_messages(session_id).await {
            Ok(messages) => match self.cache.put_messages(session_id, messages.clone(), true).await {
                Ok(stored) => Ok(MessagesResult {
                    messages: stored.messages,
                    from_cache: false,
                    is_complete: stored.is_complete,
                }),
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Failed to cache messages");
                    Ok(MessagesResult {
                        messages: tether_cache::merge_messages(Vec::new(), messages),
                        from_cache: false,
                        is_complete: true,
                    })
                }
            },
            Err(e) => match self.cached_messages(session_id).await {
                Some(cached) => {
                    warn!(session_id = %session_id, error = %e, "Message fetch failed, serving cache");
                    Ok(MessagesResult::cached(cached))
                }
                None => Err(e.into()),
            },
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a session. Failures are returned as-is and never retried.
    pub async fn create_session(&self, request: CreateSessionRequest) -> Result<Session> {
        if self.network.is_offline() {
            return Err(SyncError::Offline);
        }

        let session = self.backend.create_session(request).await?;
        if let Err(e) = self.cache.upsert_session(&session).await {
            warn!(session_id = %session.id, error = %e, "Failed to cache new session");
        }
        debug!(session_id = %session.id, "Created session");
        Ok(session)
    }

    /// Delete a session.
    ///
    /// The local copy is removed first and stays removed even if the remote
    /// delete fails.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.cache.remove_session(session_id).await?;

        if self.network.is_offline() {
            return Err(SyncError::Offline);
        }

        if let Err(e) = self.backend.delete_session(session_id).await {
            warn!(session_id = %session_id, error = %e, "Remote delete failed");
            return Err(e.into());
        }
        debug!(session_id = %session_id, "Deleted session");
        Ok(())
    }

    /// Update a session, showing the change locally before the backend confirms it.
    ///
    /// On failure the local entry is restored.
    pub async fn update_session(
        &self,
        session_id: &str,
        request: UpdateSessionRequest,
    ) -> Result<Session> {
        let patch = SessionPatch {
            title: request.title.clone(),
            updated_at: Some(now_ms()),
        };
        let previous = self.cache.patch_session(session_id, &patch).await?;

        let outcome = if self.network.is_offline() {
            Err(SyncError::Offline)
        } else {
            self.backend
                .update_session(session_id, request)
                .await
                .map_err(SyncError::from)
        };

        match outcome {
            Ok(session) => {
                if let Err(e) = self.cache.upsert_session(&session).await {
                    warn!(session_id = %session_id, error = %e, "Failed to cache updated session");
                }
                Ok(session)
            }
            Err(e) => {
                if let Some(previous) = previous {
                    debug!(session_id = %session_id, "Rolling back local update");
                    self.cache.restore_session(previous).await?;
                }
                Err(e)
            }
        }
    }

    /// Uncounted look at the cached messages, used to decide whether to fetch.
    async fn peeked_messages(&self, session_id: &str) -> Option<CachedMessages> {
        match self.cache.peek_messages(session_id).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Cached messages served to the caller, treating cache read failures as a miss.
    async fn cached_messages(&self, session_id: &str) -> Option<CachedMessages> {
        match self.cache.get_messages(session_id).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Cache read failed");
                None
            }
        }
    }
}

fn uncached_list(sessions: &[Session]) -> Vec<CachedSession> {
    let now = now_ms();
    let mut list: Vec<CachedSession> = sessions
        .iter()
        .map(|s| CachedSession::from_session(s, now, None))
        .collect();
    list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    list
}
