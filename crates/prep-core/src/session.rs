//! Session domain model.
//!
//! This module contains the core types describing one coaching session:
//! the conversation exchanged with the interviewer model, cumulative token
//! usage, and the per-session turn counter.

use serde::{Deserialize, Serialize};

/// Maximum number of answer submissions allowed per session.
///
/// Submissions past this cap are refused without issuing a remote call.
pub const MAX_QUERIES_PER_SESSION: u32 = 5;

/// Represents the role of a message in a conversation.
///
/// Serialized lowercase to match the chat-completion wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System-generated message (the coach's instructions).
    System,
    /// Message from the user.
    User,
    /// Message from the AI interviewer.
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token counts reported by the remote for a single call.
///
/// Counts are signed at the wire boundary: the remote is trusted to supply
/// non-negative values and nothing here clamps them (pass-through is
/// deliberate, see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

/// Cumulative usage counters for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct UsageCounters {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    /// Estimated spend in USD, derived from fixed per-token rates.
    pub estimated_cost: f64,
}

/// Represents one coaching session in the application's core logic.
///
/// This is the "pure" model that the business logic layer operates on.
/// The record is exclusively owned by a single session context; access is
/// strictly sequential, so no interior locking is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    pub id: String,
    /// Ordered message history exchanged with the interviewer model.
    /// Append-only during a turn; fully replaced on reset.
    pub conversation: Vec<Message>,
    pub job_role: String,
    /// Whether a practice run has been started.
    pub started: bool,
    /// Number of answer submissions in this session.
    pub query_count: u32,
    pub usage: UsageCounters,
    pub created_at: String,
}

impl SessionRecord {
    /// Creates a fresh record with an empty conversation.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation: Vec::new(),
            job_role: String::new(),
            started: false,
            query_count: 0,
            usage: UsageCounters::default(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Replaces this record with a fresh default one.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn push(&mut self, message: Message) {
        self.conversation.push(message);
    }

    /// Returns the content of the most recent assistant message, if any.
    pub fn last_assistant_message(&self) -> Option<&str> {
        self.conversation
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Whether the per-session submission cap has been reached.
    pub fn limit_reached(&self) -> bool {
        self.query_count >= MAX_QUERIES_PER_SESSION
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new()
    }
}
