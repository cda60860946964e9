// Session document persisted in the session store
//
// The document holds only plain user/assistant text turns. Tool calls and
// tool results live inside a single turn's orchestration and are never
// persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a persisted history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredRole {
    User,
    Assistant,
}

/// One persisted history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: StoredRole,
    pub content: String,
    pub ts: DateTime<Utc>,
}

impl StoredMessage {
    pub fn user(content: impl Into<String>, ts: DateTime<Utc>) -> Self {
        Self {
            role: StoredRole::User,
            content: content.into(),
            ts,
        }
    }

    pub fn assistant(content: impl Into<String>, ts: DateTime<Utc>) -> Self {
        Self {
            role: StoredRole::Assistant,
            content: content.into(),
            ts,
        }
    }
}

/// Per-session state document, keyed `sessions:<id>` in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDoc {
    pub created_at: DateTime<Utc>,
    /// BCP-47 tag detected on the first turn; re-detected only when absent
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

impl SessionDoc {
    /// Fresh document for a session observed for the first time
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            language: None,
            messages: Vec::new(),
        }
    }

    /// Append a user/assistant exchange and drop oldest entries beyond `max`
    pub fn push_exchange(&mut self, user: StoredMessage, assistant: StoredMessage, max: usize) {
        self.messages.push(user);
        self.messages.push(assistant);
        if self.messages.len() > max {
            let drop = self.messages.len() - max;
            self.messages.drain(..drop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn round_trips_through_json() {
        let mut doc = SessionDoc::new(now());
        doc.language = Some("pl-PL".into());
        doc.push_exchange(
            StoredMessage::user("Cześć", now()),
            StoredMessage::assistant("Dzień dobry!", now()),
            20,
        );

        let encoded = serde_json::to_string(&doc).unwrap();
        let decoded: SessionDoc = serde_json::from_str(&encoded).unwrap();
        assert_eq!(doc, decoded);
    }

    #[test]
    fn push_exchange_trims_oldest_first() {
        let mut doc = SessionDoc::new(now());
        for i in 0..6 {
            doc.push_exchange(
                StoredMessage::user(format!("u{i}"), now()),
                StoredMessage::assistant(format!("a{i}"), now()),
                4,
            );
        }
        assert_eq!(doc.messages.len(), 4);
        assert_eq!(doc.messages[0].content, "u4");
        assert_eq!(doc.messages[3].content, "a5");
    }

    #[test]
    fn missing_optional_fields_default() {
        let doc: SessionDoc =
            serde_json::from_str(r#"{"createdAt": "2025-01-01T00:00:00Z"}"#).unwrap();
        assert!(doc.language.is_none());
        assert!(doc.messages.is_empty());
    }
}
