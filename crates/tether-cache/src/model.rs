//! Persisted cache records.
//!
//! All timestamps are epoch milliseconds. `cached_at` is when a record was
//! first written, `synced_at` when it last matched the server.

use serde::{Deserialize, Serialize};
use tether_client::{Message, Session, SessionSummary, ShareInfo};

/// A session list entry as stored offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    pub id: String,
    #[serde(default)]
    pub directory: String,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareInfo>,
    pub created_at: i64,
    pub updated_at: i64,
    pub cached_at: i64,
    pub synced_at: i64,
    /// A complete message blob exists for this session.
    #[serde(default)]
    pub is_full_cache: bool,
    /// Messages held in this session's blob.
    #[serde(default)]
    pub message_count: u64,
}

impl CachedSession {
    /// Snapshot `session` at `now`, carrying bookkeeping over from `previous`.
    pub fn from_session(session: &Session, now: i64, previous: Option<&CachedSession>) -> Self {
        Self {
            id: session.id.clone(),
            directory: session.directory.clone(),
            parent_id: session.parent_id.clone(),
            title: session.title.clone(),
            summary: session.summary,
            share: session.share.clone(),
            created_at: session.time.created,
            updated_at: session.time.updated,
            cached_at: previous.map_or(now, |p| p.cached_at.min(now)),
            synced_at: now,
            is_full_cache: previous.is_some_and(|p| p.is_full_cache),
            message_count: previous.map_or(0, |p| p.message_count),
        }
    }
}

/// Metadata for the last stored session list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListMeta {
    pub fetched_at: i64,
    /// Number of sessions the server returned.
    pub total_count: u64,
    /// The stored list holds every session the server returned.
    pub is_complete: bool,
}

/// Messages of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedMessages {
    pub session_id: String,
    /// Unique by ID, ascending by creation time.
    pub messages: Vec<Message>,
    pub cached_at: i64,
    pub synced_at: i64,
    /// The blob holds the session's full history.
    pub is_complete: bool,
}

/// Local edit to a cached session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub title: Option<String>,
    pub updated_at: Option<i64>,
}

impl SessionPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            updated_at: None,
        }
    }

    pub fn apply(&self, session: &mut CachedSession) {
        if let Some(title) = &self.title {
            session.title = title.clone();
        }
        if let Some(updated_at) = self.updated_at {
            session.updated_at = updated_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        serde_json::from_value(serde_json::json!({
            "id": "ses_1",
            "directory": "/work",
            "parentID": "ses_0",
            "title": "Fix build",
            "time": { "created": 100, "updated": 200 }
        }))
        .unwrap()
    }

    #[test]
    fn test_from_session_preserves_bookkeeping() {
        let first = CachedSession::from_session(&session(), 1_000, None);
        assert_eq!(first.cached_at, 1_000);
        assert!(!first.is_full_cache);

        let mut previous = first.clone();
        previous.is_full_cache = true;
        previous.message_count = 7;

        let second = CachedSession::from_session(&session(), 2_000, Some(&previous));
        assert_eq!(second.cached_at, 1_000);
        assert_eq!(second.synced_at, 2_000);
        assert!(second.is_full_cache);
        assert_eq!(second.message_count, 7);
        assert!(second.cached_at <= second.synced_at);
    }

    #[test]
    fn test_session_conversion_and_field_names() {
        let cached = CachedSession::from_session(&session(), 1_000, None);
        assert_eq!(cached.id, "ses_1");
        assert_eq!(cached.parent_id.as_deref(), Some("ses_0"));
        assert_eq!((cached.created_at, cached.updated_at), (100, 200));

        let json = serde_json::to_value(&cached).unwrap();
        assert_eq!(json["parentID"], "ses_0");
        assert_eq!(json["createdAt"], 100);
        assert_eq!(json["isFullCache"], false);
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let mut cached = CachedSession::from_session(&session(), 1_000, None);
        SessionPatch::title("Renamed").apply(&mut cached);
        assert_eq!(cached.title, "Renamed");
        assert_eq!(cached.updated_at, 200);

        SessionPatch::default().apply(&mut cached);
        assert_eq!(cached.title, "Renamed");
    }
}
