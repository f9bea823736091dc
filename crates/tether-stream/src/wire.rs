//! Line decoding for the streaming wire format.
//!
//! Each meaningful line is `data: <json>` or `data: [DONE]`. Lines without the
//! prefix are ignored. A payload that is not JSON is forwarded as raw text when
//! short and dropped otherwise; JSON that does not match a known shape is
//! dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Which kind of stream a decoder is reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamKind {
    /// Terminal bytes for one terminal session.
    Terminal,
    /// Session events. With a session ID, events for other sessions are dropped.
    SessionEvents { session_id: Option<String> },
}

/// Control and data frames of a terminal stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TerminalFrame {
    Connected,
    Data {
        data: String,
    },
    Exit {
        #[serde(rename = "exitCode")]
        exit_code: i32,
        #[serde(default)]
        signal: Option<i32>,
    },
}

/// A live notification about a conversation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: EventProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventProperties {
    #[serde(rename = "sessionID", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "messageID", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Value>,
}

/// One decoded line.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// End of meaningful data; the connection may stay open.
    Done,
    Terminal(TerminalFrame),
    Event(SessionEvent),
    /// Undecodable payload short enough to show as plain output.
    Raw(String),
}

/// Decodes lines for one stream.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    kind: StreamKind,
    raw_fallback_max_len: usize,
}

impl LineDecoder {
    pub fn new(kind: StreamKind, raw_fallback_max_len: usize) -> Self {
        Self {
            kind,
            raw_fallback_max_len,
        }
    }

    /// Decode a single line. `None` means the line carries nothing to deliver.
    pub fn decode(&self, line: &str) -> Option<Frame> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let payload = line.strip_prefix(DATA_PREFIX)?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload);

        if payload.trim() == DONE_SENTINEL {
            return Some(Frame::Done);
        }

        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                if payload.len() <= self.raw_fallback_max_len {
                    return Some(Frame::Raw(payload.to_string()));
                }
                tracing::debug!(len = payload.len(), error = %e, "Dropping undecodable line");
                return None;
            }
        };

        match &self.kind {
            StreamKind::Terminal => match serde_json::from_value::<TerminalFrame>(value) {
                Ok(frame) => Some(Frame::Terminal(frame)),
                Err(e) => {
                    tracing::trace!(error = %e, "Ignoring unknown terminal frame");
                    None
                }
            },
            StreamKind::SessionEvents { session_id } => {
                let event = match serde_json::from_value::<SessionEvent>(value) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::trace!(error = %e, "Ignoring malformed session event");
                        return None;
                    }
                };
                if let (Some(wanted), Some(actual)) =
                    (session_id.as_deref(), event.properties.session_id.as_deref())
                    && wanted != actual
                {
                    return None;
                }
                Some(Frame::Event(event))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal() -> LineDecoder {
        LineDecoder::new(StreamKind::Terminal, 16)
    }

    fn events_for(session: &str) -> LineDecoder {
        LineDecoder::new(
            StreamKind::SessionEvents {
                session_id: Some(session.to_string()),
            },
            16,
        )
    }

    #[test]
    fn test_terminal_frames() {
        let decoder = terminal();
        assert_eq!(
            decoder.decode(r#"data: {"type":"connected"}"#),
            Some(Frame::Terminal(TerminalFrame::Connected))
        );
        assert_eq!(
            decoder.decode(r#"data: {"type":"data","data":"ls\r\n"}"#),
            Some(Frame::Terminal(TerminalFrame::Data {
                data: "ls\r\n".to_string()
            }))
        );
        assert_eq!(
            decoder.decode(r#"data: {"type":"exit","exitCode":130,"signal":2}"#),
            Some(Frame::Terminal(TerminalFrame::Exit {
                exit_code: 130,
                signal: Some(2)
            }))
        );
        assert_eq!(
            decoder.decode(r#"data: {"type":"exit","exitCode":0,"signal":null}"#),
            Some(Frame::Terminal(TerminalFrame::Exit {
                exit_code: 0,
                signal: None
            }))
        );
    }

    #[test]
    fn test_done_sentinel_and_crlf() {
        assert_eq!(terminal().decode("data: [DONE]\r"), Some(Frame::Done));
    }

    #[test]
    fn test_unprefixed_lines_ignored() {
        let decoder = terminal();
        assert_eq!(decoder.decode(""), None);
        assert_eq!(decoder.decode(": keep-alive"), None);
        assert_eq!(decoder.decode("event: message"), None);
        assert_eq!(decoder.decode(r#"{"type":"connected"}"#), None);
    }

    #[test]
    fn test_short_garbage_becomes_raw_long_garbage_dropped() {
        let decoder = terminal();
        assert_eq!(
            decoder.decode("data: not json"),
            Some(Frame::Raw("not json".to_string()))
        );
        assert_eq!(decoder.decode("data: this is far too long to show"), None);
    }

    #[test]
    fn test_unknown_json_shape_dropped() {
        assert_eq!(terminal().decode(r#"data: {"type":"ping"}"#), None);
    }

    #[test]
    fn test_events_filtered_by_session() {
        let decoder = events_for("ses_1");
        let mine = decoder.decode(
            r#"data: {"type":"message.updated","properties":{"sessionID":"ses_1","info":{"id":"msg_1"}}}"#,
        );
        let theirs =
            decoder.decode(r#"data: {"type":"message.updated","properties":{"sessionID":"ses_2"}}"#);
        let global = decoder.decode(r#"data: {"type":"server.connected"}"#);

        match mine {
            Some(Frame::Event(event)) => {
                assert_eq!(event.kind, "message.updated");
                assert_eq!(event.properties.info.unwrap()["id"], "msg_1");
            }
            other => panic!("expected event, got {:?}", other),
        }
        assert_eq!(theirs, None);
        assert!(matches!(global, Some(Frame::Event(_))));
    }

    #[test]
    fn test_unfiltered_event_stream_keeps_everything() {
        let decoder = LineDecoder::new(StreamKind::SessionEvents { session_id: None }, 16);
        assert!(matches!(
            decoder.decode(r#"data: {"type":"session.idle","properties":{"sessionID":"ses_9"}}"#),
            Some(Frame::Event(_))
        ));
    }
}
