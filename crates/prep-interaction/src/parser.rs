//! Tolerant parser for model responses.
//!
//! The remote returns free-form text; this module extracts the structure a
//! turn needs (scores, mood label, feedback) with best-effort pattern
//! matching. Malformed input degrades to defaults plus warnings; the only
//! thing treated as invalid is an empty payload.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The five fixed evaluation metrics, in report order.
pub const EVALUATION_METRICS: [&str; 5] = [
    "Relevance",
    "Clarity",
    "Technical Accuracy",
    "Depth",
    "Communication",
];

/// The six recognized interviewer moods.
pub const MOOD_LABELS: [&str; 6] = [
    "Encouraging",
    "Challenging",
    "Supportive",
    "Disengaged",
    "Neutral",
    "Critical",
];

const MIN_RESPONSE_LEN: usize = 5;
const MAX_RESPONSE_LEN: usize = 5000;

static FEEDBACK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Feedback:\s*(.+)").expect("valid feedback pattern"));

// One "<Name>: <digit>" pattern per metric, case-sensitive.
static METRIC_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    EVALUATION_METRICS
        .iter()
        .map(|metric| {
            let pattern =
                Regex::new(&format!(r"{metric}:\s*([0-9])")).expect("valid metric pattern");
            (*metric, pattern)
        })
        .collect()
});

// Same emoji blocks the mood prompt asks the model to draw from.
static SYMBOL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{1F600}-\u{1F64F}\u{1F300}-\u{1F5FF}\u{1F680}-\u{1F6FF}\u{1F1E0}-\u{1F1FF}]")
        .expect("valid symbol pattern")
});

/// What kind of response the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Question,
    Evaluation,
    Mood,
    IdealAnswer,
    Generic,
}

/// Scores per metric plus the coach's feedback text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EvaluationResult {
    /// Metric name → score in 1–5, 0 when missing/unparseable.
    pub scores: BTreeMap<String, u8>,
    pub feedback: String,
}

/// Mood label line plus its explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MoodResult {
    /// First line of the response, expected to carry a mood word and emoji.
    pub label: String,
    pub explanation: String,
}

/// The structured payload extracted from a response.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredContent {
    /// Question, ideal answer, or generic text (trimmed).
    Text(String),
    Evaluation(EvaluationResult),
    Mood(MoodResult),
}

/// Parse outcome: best-effort structure plus accumulated diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub content: StructuredContent,
}

impl ParsedResponse {
    /// The evaluation payload, when this response was parsed as one.
    pub fn as_evaluation(&self) -> Option<&EvaluationResult> {
        match &self.content {
            StructuredContent::Evaluation(result) => Some(result),
            _ => None,
        }
    }

    /// The mood payload, when this response was parsed as one.
    pub fn as_mood(&self) -> Option<&MoodResult> {
        match &self.content {
            StructuredContent::Mood(result) => Some(result),
            _ => None,
        }
    }

    /// The plain-text payload, when this response was parsed as text.
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            StructuredContent::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Extracts structured data from raw model output. Never panics and never
/// hard-fails on malformed content.
pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(raw: &str, kind: ResponseKind) -> ParsedResponse {
        if raw.trim().is_empty() {
            return ParsedResponse {
                is_valid: false,
                errors: vec!["Response is empty".to_string()],
                warnings: Vec::new(),
                content: StructuredContent::Text(String::new()),
            };
        }

        match kind {
            ResponseKind::Evaluation => Self::parse_evaluation(raw),
            ResponseKind::Mood => Self::parse_mood(raw),
            ResponseKind::Question | ResponseKind::IdealAnswer | ResponseKind::Generic => {
                Self::parse_text(raw)
            }
        }
    }

    fn parse_evaluation(raw: &str) -> ParsedResponse {
        let mut warnings = Vec::new();
        let mut scores = BTreeMap::new();

        for (metric, pattern) in METRIC_PATTERNS.iter() {
            match pattern.captures(raw) {
                Some(captures) => {
                    let score: u8 = captures[1].parse().unwrap_or(0);
                    if !(1..=5).contains(&score) {
                        warnings.push(format!("Score for {metric} is out of range (1-5): {score}"));
                    }
                    // out-of-range digits are kept, not clamped
                    scores.insert(metric.to_string(), score);
                }
                None => {
                    warnings.push(format!("Missing evaluation field: {metric}"));
                    scores.insert(metric.to_string(), 0);
                }
            }
        }

        let feedback = match FEEDBACK_PATTERN.captures(raw) {
            Some(captures) => captures[1].trim().to_string(),
            None => {
                warnings.push("No feedback section found in evaluation".to_string());
                String::new()
            }
        };

        ParsedResponse {
            is_valid: true,
            errors: Vec::new(),
            warnings,
            content: StructuredContent::Evaluation(EvaluationResult { scores, feedback }),
        }
    }

    fn parse_mood(raw: &str) -> ParsedResponse {
        let mut warnings = Vec::new();
        let trimmed = raw.trim();

        let (label, explanation) = match trimmed.split_once('\n') {
            Some((first, rest)) => (first.trim().to_string(), rest.trim().to_string()),
            None => {
                warnings.push("Mood response should have mood label and explanation".to_string());
                (trimmed.to_string(), String::new())
            }
        };

        if !SYMBOL_PATTERN.is_match(&label) {
            warnings.push("Mood response should include an emoji".to_string());
        }

        if !MOOD_LABELS.iter().any(|mood| label.contains(mood)) {
            warnings.push("Mood response doesn't contain expected mood labels".to_string());
        }

        ParsedResponse {
            is_valid: true,
            errors: Vec::new(),
            warnings,
            content: StructuredContent::Mood(MoodResult { label, explanation }),
        }
    }

    fn parse_text(raw: &str) -> ParsedResponse {
        let trimmed = raw.trim().to_string();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if trimmed.chars().count() < MIN_RESPONSE_LEN {
            errors.push("Response is too short".to_string());
        } else if trimmed.chars().count() > MAX_RESPONSE_LEN {
            warnings.push("Response is very long".to_string());
        }

        ParsedResponse {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            content: StructuredContent::Text(trimmed),
        }
    }
}
