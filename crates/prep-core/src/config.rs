//! Sampling and credential configuration types.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Default model used for all coaching calls.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Sampling parameters sent with every chat-completion request.
///
/// Values are expected to be clamped into range (see
/// [`crate::validate::settings`]) before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub model: String,
    pub temperature: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            frequency_penalty: 1.0,
            presence_penalty: 1.0,
            top_p: 0.1,
            max_tokens: 100,
        }
    }
}

/// Interview difficulty selected by the user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Settings the user can adjust for a coaching session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachSettings {
    pub sampling: SamplingConfig,
    pub difficulty: Difficulty,
    /// Upper bound for generated model answers, in words.
    pub ideal_answer_word_count: u32,
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            difficulty: Difficulty::default(),
            ideal_answer_word_count: 100,
        }
    }
}

/// OpenAI-compatible credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model_name: Option<String>,
}

/// Secret configuration loaded from secret.json or the environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretConfig {
    pub openai: Option<OpenAIConfig>,
}
