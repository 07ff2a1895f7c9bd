//! Message-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message between the operator and one counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(alias = "_id", default)]
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Whether the message was sent by or addressed to `user_id`.
    pub fn involves(&self, user_id: &str) -> bool {
        self.from == user_id || self.to == user_id
    }
}

/// Payload emitted over the relay when the operator sends a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub content: String,
}

impl OutgoingMessage {
    /// Build a send payload. Returns None for blank content.
    pub fn compose(from: &str, to: &str, content: &str) -> Option<Self> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(Self {
            from: from.to_string(),
            to: to.to_string(),
            content: content.to_string(),
        })
    }
}

/// Put messages in chronological order.
///
/// Only sorts when every message carries a timestamp; otherwise the order the
/// server returned is kept as-is.
pub fn chronological(mut messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    if messages.iter().all(|m| m.created_at.is_some()) {
        messages.sort_by_key(|m| m.created_at);
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, created_at: Option<&str>) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            from: "a".to_string(),
            to: "b".to_string(),
            content: id.to_string(),
            created_at: created_at.map(|s| s.parse().unwrap()),
        }
    }

    #[test]
    fn test_parse_wire_message() {
        let json = r#"{
            "_id": "m1",
            "from": "admin-1",
            "to": "user-7",
            "content": "Your tour is confirmed",
            "createdAt": "2024-05-01T09:30:00.000Z"
        }"#;
        let m: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(m.id, "m1");
        assert_eq!(m.created_at.unwrap().to_rfc3339(), "2024-05-01T09:30:00+00:00");
        assert!(m.involves("admin-1"));
        assert!(m.involves("user-7"));
        assert!(!m.involves("user-8"));
    }

    #[test]
    fn test_compose_rejects_blank() {
        assert!(OutgoingMessage::compose("a", "b", "").is_none());
        assert!(OutgoingMessage::compose("a", "b", "  \n\t ").is_none());
        let out = OutgoingMessage::compose("a", "b", "  hi there ").unwrap();
        assert_eq!(out.content, "hi there");
    }

    #[test]
    fn test_outgoing_wire_shape() {
        let out = OutgoingMessage::compose("a", "b", "hello").unwrap();
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v, serde_json::json!({"from": "a", "to": "b", "content": "hello"}));
    }

    #[test]
    fn test_chronological_sorts_when_all_timestamped() {
        let sorted = chronological(vec![
            msg("late", Some("2024-05-01T10:00:00Z")),
            msg("early", Some("2024-05-01T09:00:00Z")),
        ]);
        assert_eq!(sorted[0].id, "early");
        assert_eq!(sorted[1].id, "late");
    }

    #[test]
    fn test_chronological_keeps_server_order_without_timestamps() {
        let kept = chronological(vec![
            msg("first", Some("2024-05-01T10:00:00Z")),
            msg("second", None),
        ]);
        assert_eq!(kept[0].id, "first");
        assert_eq!(kept[1].id, "second");
    }
}
