//! Chat session and message types for Parley.
//!
//! A session belongs to one user and carries denormalized roll-up counters
//! (`message_count`, `token_count`, `total_cost`) derived from its live
//! messages. Messages belong to exactly one session for their whole life.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::user::UserId;

/// Longest accepted session topic, in characters.
pub const MAX_TOPIC_CHARS: usize = 200;

/// Longest accepted model name, in characters.
pub const MAX_MODEL_CHARS: usize = 50;

/// Longest accepted error text on a failed message, in characters.
pub const MAX_ERROR_MSG_CHARS: usize = 2000;

/// Lifecycle status of a chat session.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (status IN ('active', 'ended', 'deleted'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Ended,
    Deleted,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Ended => write!(f, "ended"),
            SessionStatus::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SessionStatus::Active),
            "ended" => Ok(SessionStatus::Ended),
            "deleted" => Ok(SessionStatus::Deleted),
            other => Err(format!("invalid session status: '{other}'")),
        }
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// Delivery outcome of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Normal,
    Error,
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStatus::Normal => write!(f, "normal"),
            MessageStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(MessageStatus::Normal),
            "error" => Ok(MessageStatus::Error),
            other => Err(format!("invalid message status: '{other}'")),
        }
    }
}

/// A chat session owned by one user.
///
/// The three roll-up fields always equal the sums over the session's live
/// messages once a mutation and its recompute have both completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: UserId,
    pub topic: String,
    pub model: String,
    pub channel_id: i64,
    pub message_count: u32,
    pub token_count: u64,
    pub total_cost: f64,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Time of the most recent roll-up recompute, `None` until the first message.
    pub last_message_at: Option<DateTime<Utc>>,
}

/// A single message within a chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub tokens: u32,
    pub cost: f64,
    pub status: MessageStatus,
    pub error_msg: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Apply a partial update in place.
    ///
    /// Switching back to `Normal` clears any stored error text.
    pub fn apply(&mut self, update: &MessageUpdate, now: DateTime<Utc>) {
        if let Some(content) = &update.content {
            self.content = content.clone();
        }
        if let Some(tokens) = update.tokens {
            self.tokens = tokens;
        }
        if let Some(cost) = update.cost {
            self.cost = cost;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(error_msg) = &update.error_msg {
            self.error_msg = Some(error_msg.clone());
        }
        if self.status == MessageStatus::Normal {
            self.error_msg = None;
        }
        self.updated_at = now;
    }
}

/// Input for creating a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSession {
    pub topic: String,
    /// Falls back to the configured default model when absent.
    pub model: Option<String>,
    pub channel_id: Option<i64>,
}

/// Input for creating a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// Caller-supplied id; generated when absent.
    pub id: Option<Uuid>,
    pub role: MessageRole,
    pub content: String,
    pub tokens: u32,
    pub cost: f64,
    #[serde(default)]
    pub status: MessageStatus,
    pub error_msg: Option<String>,
}

impl NewMessage {
    /// A normal-status message with no explicit id.
    pub fn new(role: MessageRole, content: impl Into<String>, tokens: u32, cost: f64) -> Self {
        Self {
            id: None,
            role,
            content: content.into(),
            tokens,
            cost,
            status: MessageStatus::Normal,
            error_msg: None,
        }
    }
}

/// Partial update of a message's mutable fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageUpdate {
    pub content: Option<String>,
    pub tokens: Option<u32>,
    pub cost: Option<f64>,
    pub status: Option<MessageStatus>,
    pub error_msg: Option<String>,
}

impl MessageUpdate {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.tokens.is_none()
            && self.cost.is_none()
            && self.status.is_none()
            && self.error_msg.is_none()
    }
}

/// Roll-up values written by a recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAggregate {
    pub session_id: Uuid,
    pub message_count: u32,
    pub token_count: u64,
    pub total_cost: f64,
    pub last_message_at: DateTime<Utc>,
}

/// Per-user session statistics over live sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: u64,
    pub active_sessions: u64,
    pub total_messages: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_messages_per_session: f64,
}

/// Message statistics for one session or for all of a user's sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageStats {
    pub total_messages: u64,
    pub user_messages: u64,
    pub assistant_messages: u64,
    pub system_messages: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_tokens_per_message: f64,
}

/// Usage grouped by model name.
/// Counts from a bulk soft-delete of a user's sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsDeleted {
    pub sessions: u64,
    pub messages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub model: String,
    pub session_count: u64,
    pub message_count: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message() -> ChatMessage {
        let now = Utc::now();
        ChatMessage {
            id: Uuid::now_v7(),
            session_id: Uuid::now_v7(),
            role: MessageRole::Assistant,
            content: "hello".to_string(),
            tokens: 10,
            cost: 0.01,
            status: MessageStatus::Error,
            error_msg: Some("upstream timeout".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_session_status_roundtrip() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Ended,
            SessionStatus::Deleted,
        ] {
            let s = status.to_string();
            let parsed: SessionStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_session_status_serde() {
        let json = serde_json::to_string(&SessionStatus::Ended).unwrap();
        assert_eq!(json, "\"ended\"");
        let parsed: SessionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SessionStatus::Ended);
    }

    #[test]
    fn test_message_role_parse_is_case_insensitive() {
        assert_eq!("Assistant".parse::<MessageRole>().unwrap(), MessageRole::Assistant);
        assert!("tool".parse::<MessageRole>().is_err());
    }

    #[test]
    fn test_message_status_default_is_normal() {
        assert_eq!(MessageStatus::default(), MessageStatus::Normal);
    }

    #[test]
    fn test_apply_update_changes_only_given_fields() {
        let mut msg = make_message();
        let update = MessageUpdate {
            tokens: Some(42),
            ..Default::default()
        };
        msg.apply(&update, Utc::now());
        assert_eq!(msg.tokens, 42);
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.status, MessageStatus::Error);
        assert_eq!(msg.error_msg.as_deref(), Some("upstream timeout"));
    }

    #[test]
    fn test_apply_update_to_normal_clears_error() {
        let mut msg = make_message();
        let update = MessageUpdate {
            status: Some(MessageStatus::Normal),
            ..Default::default()
        };
        msg.apply(&update, Utc::now());
        assert_eq!(msg.status, MessageStatus::Normal);
        assert!(msg.error_msg.is_none());
    }

    #[test]
    fn test_message_update_is_empty() {
        assert!(MessageUpdate::default().is_empty());
        let update = MessageUpdate {
            cost: Some(0.5),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_new_message_deserialize_defaults_status() {
        let json = r#"{"id":null,"role":"user","content":"hi","tokens":3,"cost":0.0,"error_msg":null}"#;
        let msg: NewMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.status, MessageStatus::Normal);
        assert_eq!(msg.role, MessageRole::User);
    }
}
