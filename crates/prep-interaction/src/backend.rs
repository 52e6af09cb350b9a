//! The chat-completion backend seam.
//!
//! The application layer talks to the remote through this trait so that
//! tests (and alternative providers) can swap in their own implementation.

use async_trait::async_trait;
use prep_core::Result;
use prep_core::config::SamplingConfig;
use prep_core::session::{Message, TokenUsage};
use serde::{Deserialize, Serialize};

/// One chat-completion request: message history plus sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub sampling: SamplingConfig,
    pub messages: Vec<Message>,
}

/// What a successful chat-completion call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub content: String,
    pub finish_reason: Option<String>,
    pub model: String,
    pub usage: TokenUsage,
}

/// An opaque remote that turns a conversation into generated text, or
/// fails with a classifiable [`prep_core::PrepError`].
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatOutcome>;
}
