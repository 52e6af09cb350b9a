//! Chat-completions REST client.
//!
//! Calls an OpenAI-compatible chat-completions endpoint directly and maps
//! HTTP failures onto the application error taxonomy so the retry layer
//! can tell transient failures from permanent ones.

use std::time::Duration;

use async_trait::async_trait;
use prep_core::config::OpenAIConfig;
use prep_core::session::{Message, TokenUsage};
use prep_core::{PrepError, Result};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};

use crate::backend::{ChatBackend, ChatOutcome, ChatRequest};

const BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Client for an OpenAI-compatible chat-completions HTTP API.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ChatClient {
    /// Creates a new client with the provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Creates a client from resolved credentials.
    pub fn from_credentials(credentials: &OpenAIConfig) -> Self {
        Self::new(credentials.api_key.clone())
    }

    /// Overrides the endpoint URL (self-hosted gateways, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send_request(&self, body: &ChatCompletionRequest<'_>) -> Result<ChatCompletionResponse> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    PrepError::timeout(format!("chat request timed out: {err}"))
                } else {
                    PrepError::remote(format!("chat request failed: {err}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        response
            .json()
            .await
            .map_err(|err| PrepError::remote(format!("Failed to parse chat response: {err}")))
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        let body = ChatCompletionRequest {
            model: &request.sampling.model,
            temperature: request.sampling.temperature,
            frequency_penalty: request.sampling.frequency_penalty,
            presence_penalty: request.sampling.presence_penalty,
            top_p: request.sampling.top_p,
            max_tokens: request.sampling.max_tokens,
            messages: &request.messages,
        };

        let parsed = self.send_request(&body).await?;
        extract_outcome(parsed)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
    top_p: f64,
    max_tokens: u32,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_outcome(response: ChatCompletionResponse) -> Result<ChatOutcome> {
    let model = response.model.unwrap_or_default();
    let usage = response.usage.unwrap_or_default();

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| PrepError::remote("Chat API returned no choices"))?;

    let content = choice
        .message
        .content
        .ok_or_else(|| PrepError::remote("Chat API returned no content in the response"))?;

    Ok(ChatOutcome {
        content,
        finish_reason: choice.finish_reason,
        model,
        usage,
    })
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> PrepError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    match status {
        StatusCode::TOO_MANY_REQUESTS => PrepError::RateLimited {
            message,
            retry_after_secs: retry_after.map(|d| d.as_secs()),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PrepError::Auth(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => PrepError::Timeout(message),
        _ => PrepError::Remote {
            status: Some(status.as_u16()),
            message,
        },
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // Retry-After HTTP-date parsing is omitted for simplicity
    None
}
