//! Wire formats for the live-update connection
//!
//! Inbound: `{"topic": "...", "payload": ...}` plus the server's `pong`.
//! Outbound: `{"type": "subscribe" | "unsubscribe", "topic": "..."}` and `ping`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Topic carrying proxy session notifications
pub const SESSIONS_TOPIC: &str = "sessions";

/// A topic-addressed message pushed by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub topic: String,
    #[serde(default)]
    pub payload: Value,
}

/// Server-originated control frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerControl {
    Pong,
}

/// Any frame the server may send
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    Message(InboundMessage),
    Control(ServerControl),
}

impl InboundFrame {
    /// Decode a text frame
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Client-originated control frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    Ping,
}

impl ControlMessage {
    /// Encode as a text frame
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Summary of a recorded proxy session, as published on [`SESSIONS_TOPIC`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionStub {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ConfigID")]
    pub config_id: String,
    #[serde(default)]
    pub response_status_code: i32,
    pub request_method: String,
    pub request_path: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub tags: String,
}

/// Payloads published on [`SESSIONS_TOPIC`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    NewSession { session: SessionStub },
    DeleteSession { ids: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_topic_message() {
        let frame = InboundFrame::parse(r#"{"topic":"sessions","payload":{"a":1}}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Message(InboundMessage {
                topic: "sessions".to_string(),
                payload: json!({"a": 1}),
            })
        );
    }

    #[test]
    fn parse_pong() {
        let frame = InboundFrame::parse(r#"{"type":"pong"}"#).unwrap();
        assert_eq!(frame, InboundFrame::Control(ServerControl::Pong));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(InboundFrame::parse("not json").is_err());
        assert!(InboundFrame::parse(r#"{"payload":1}"#).is_err());
        assert!(InboundFrame::parse(r#"{"type":"mystery"}"#).is_err());
    }

    #[test]
    fn control_wire_format() {
        let sub = ControlMessage::Subscribe {
            topic: "sessions".to_string(),
        };
        let value: Value = serde_json::from_str(&sub.to_text().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "subscribe", "topic": "sessions"}));

        let ping: Value = serde_json::from_str(&ControlMessage::Ping.to_text().unwrap()).unwrap();
        assert_eq!(ping, json!({"type": "ping"}));
    }

    #[test]
    fn session_events_decode() {
        let new_session = json!({
            "type": "new_session",
            "session": {
                "ID": "s1",
                "ConfigID": "c1",
                "ResponseStatusCode": 200,
                "RequestMethod": "GET",
                "RequestPath": "/v1/models",
                "Timestamp": "2025-01-02T03:04:05Z",
                "DurationMs": 12,
                "Note": "",
                "Tags": ""
            }
        });
        match serde_json::from_value::<SessionEvent>(new_session).unwrap() {
            SessionEvent::NewSession { session } => {
                assert_eq!(session.id, "s1");
                assert_eq!(session.config_id, "c1");
                assert_eq!(session.request_path, "/v1/models");
            }
            other => panic!("expected NewSession, got {:?}", other),
        }

        let deleted = json!({"type": "delete_session", "ids": ["a", "b"]});
        assert_eq!(
            serde_json::from_value::<SessionEvent>(deleted).unwrap(),
            SessionEvent::DeleteSession {
                ids: vec!["a".to_string(), "b".to_string()]
            }
        );
    }
}
