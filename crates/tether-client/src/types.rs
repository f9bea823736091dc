//! Request and response types for the backend API.
//!
//! Field names follow the backend's JSON (`parentID`, `sessionID`, epoch
//! millisecond timestamps under `time`).

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// A conversation session as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID.
    pub id: String,
    /// Working directory the session runs in.
    #[serde(default)]
    pub directory: String,
    /// Parent session, for forks and sub-agents.
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Session title.
    #[serde(default)]
    pub title: String,
    /// Diff summary of the session's edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
    /// Public share link, if shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareInfo>,
    /// Creation and update times.
    pub time: SessionTime,
}

/// Session timestamps in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionTime {
    pub created: i64,
    pub updated: i64,
}

/// Line-level diff summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub additions: u64,
    pub deletions: u64,
    pub files: u64,
}

/// Share link info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareInfo {
    pub url: String,
}

/// Request to create a new session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Optional title for the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Parent session to fork from.
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Partial update to a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// A conversation message: header info plus its content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub info: MessageInfo,
    #[serde(default)]
    pub parts: Vec<serde_json::Value>,
}

impl Message {
    /// Message ID.
    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Creation time in epoch milliseconds.
    pub fn created(&self) -> i64 {
        self.info.time.created
    }
}

/// Message header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    /// Message ID.
    pub id: String,
    /// Owning session.
    #[serde(rename = "sessionID")]
    pub session_id: String,
    /// `user` or `assistant`.
    pub role: String,
    /// Creation and completion times.
    pub time: MessageTime,
    /// Backend fields the client does not interpret (model, cost, tokens, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Message timestamps in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageTime {
    pub created: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<i64>,
}

/// Request to append a user message to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendMessageRequest {
    /// Client-chosen message ID, for idempotent retries.
    #[serde(rename = "messageID", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Content parts.
    pub parts: Vec<serde_json::Value>,
}

impl AppendMessageRequest {
    /// A single plain-text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message_id: None,
            parts: vec![serde_json::json!({ "type": "text", "text": text.into() })],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Terminals
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a terminal session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTerminalRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<TerminalSize>,
}

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

/// A terminal session on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub status: String,
}

/// Input bytes for a terminal session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalInputRequest {
    pub data: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default = "default_healthy")]
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

fn default_healthy() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_uses_backend_field_names() {
        let session: Session = serde_json::from_value(serde_json::json!({
            "id": "ses_1",
            "directory": "/work",
            "parentID": "ses_0",
            "title": "Fix build",
            "summary": { "additions": 3, "deletions": 1, "files": 2 },
            "share": { "url": "https://share/ses_1" },
            "time": { "created": 1000, "updated": 2000 }
        }))
        .unwrap();

        assert_eq!(session.parent_id.as_deref(), Some("ses_0"));
        assert_eq!(session.summary.unwrap().files, 2);
        assert_eq!(session.time.updated, 2000);
    }

    #[test]
    fn test_session_optional_fields_default() {
        let session: Session = serde_json::from_value(serde_json::json!({
            "id": "ses_1",
            "time": { "created": 1, "updated": 1 }
        }))
        .unwrap();

        assert!(session.parent_id.is_none());
        assert!(session.share.is_none());
        assert_eq!(session.title, "");
    }

    #[test]
    fn test_message_keeps_unknown_info_fields() {
        let json = serde_json::json!({
            "info": {
                "id": "msg_1",
                "sessionID": "ses_1",
                "role": "assistant",
                "time": { "created": 5 },
                "modelID": "big-model",
                "cost": 0.25
            },
            "parts": [{ "type": "text", "text": "hi" }]
        });

        let message: Message = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(message.id(), "msg_1");
        assert_eq!(message.created(), 5);
        assert_eq!(message.info.extra["modelID"], "big-model");
        assert_eq!(serde_json::to_value(&message).unwrap(), json);
    }
}
