//! User input validation.
//!
//! Checks answers and job-role labels before they reach a prompt: length
//! windows, minimum word counts, and a small set of spam heuristics. Only
//! emptiness is fatal; everything else degrades to warnings so a turn can
//! proceed with imperfect input.

use once_cell::sync::Lazy;
use regex::Regex;

const MIN_ANSWER_LEN: usize = 10;
const MAX_ANSWER_LEN: usize = 2000;
const MIN_JOB_ROLE_LEN: usize = 2;
const MAX_JOB_ROLE_LEN: usize = 100;
const MIN_WORD_COUNT: usize = 3;
const REPETITION_THRESHOLD: f64 = 0.5;

// (pattern, what tripping it means)
static SPAM_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"[A-Z]{20,}", "contains long runs of capital letters"),
        (r"[!@#$%^&*]{5,}", "contains runs of special characters"),
        (r"https?://\S+", "contains a URL"),
        (r"\b\d{10,}\b", "contains a long number"),
    ]
    .into_iter()
    .map(|(pattern, reason)| (Regex::new(pattern).expect("valid spam pattern"), reason))
    .collect()
});

/// What kind of input is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A full interview answer.
    Answer,
    /// The job-role label the interview is tailored to.
    JobRole,
}

/// Result of validating one piece of user input.
#[derive(Debug, Clone)]
pub struct InputReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Input with surrounding whitespace removed.
    pub cleaned: String,
}

/// Validator for user text inputs.
pub struct InputValidator;

impl InputValidator {
    /// Validates user input, producing a report with the cleaned text.
    pub fn validate(text: &str, kind: InputKind) -> InputReport {
        let cleaned = text.trim().to_string();

        if cleaned.is_empty() {
            return InputReport {
                is_valid: false,
                errors: vec!["Input cannot be empty".to_string()],
                warnings: Vec::new(),
                cleaned,
            };
        }

        let mut warnings = Vec::new();
        let (min_len, max_len) = match kind {
            InputKind::Answer => (MIN_ANSWER_LEN, MAX_ANSWER_LEN),
            InputKind::JobRole => (MIN_JOB_ROLE_LEN, MAX_JOB_ROLE_LEN),
        };

        let char_count = cleaned.chars().count();
        if char_count < min_len {
            warnings.push(format!("Input is very short ({char_count} characters)"));
        } else if char_count > max_len {
            warnings.push(format!("Input is very long ({char_count} characters)"));
        }

        if kind == InputKind::Answer {
            let words = cleaned.split_whitespace().count();
            if words < MIN_WORD_COUNT {
                warnings.push(format!("Answer has only {words} word(s)"));
            }
            if repetition_score(&cleaned) > REPETITION_THRESHOLD {
                warnings.push("Answer repeats the same words heavily".to_string());
            }
        }

        for (pattern, reason) in SPAM_PATTERNS.iter() {
            if pattern.is_match(&cleaned) {
                warnings.push(format!("Input {reason}"));
            }
        }
        if has_repeated_char_run(&cleaned, 11) {
            warnings.push("Input contains long runs of a repeated character".to_string());
        }

        InputReport {
            is_valid: true,
            errors: Vec::new(),
            warnings,
            cleaned,
        }
    }
}

/// Share of words that are repeats of an earlier word, in [0, 1].
fn repetition_score(text: &str) -> f64 {
    let words: Vec<String> = text
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation()).to_string())
        .collect();
    if words.len() <= 1 {
        return 0.0;
    }

    let mut counts = std::collections::HashMap::new();
    for word in &words {
        *counts.entry(word.as_str()).or_insert(0usize) += 1;
    }

    let repeats: usize = counts.values().filter(|&&c| c > 1).map(|&c| c - 1).sum();
    repeats as f64 / words.len() as f64
}

// The regex crate has no backreferences, so repeated-character runs are
// detected by hand.
fn has_repeated_char_run(text: &str, run_len: usize) -> bool {
    let mut previous = None;
    let mut run = 0usize;
    for c in text.chars() {
        if Some(c) == previous {
            run += 1;
            if run >= run_len {
                return true;
            }
        } else {
            previous = Some(c);
            run = 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_invalid() {
        let report = InputValidator::validate("   ", InputKind::Answer);
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Input cannot be empty"]);
    }

    #[test]
    fn test_reasonable_answer_passes_clean() {
        let report = InputValidator::validate(
            "I led a five person team through a deadline-critical migration.",
            InputKind::Answer,
        );
        assert!(report.is_valid);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_cleaned_text_is_trimmed() {
        let report = InputValidator::validate("  Software Engineer  ", InputKind::JobRole);
        assert_eq!(report.cleaned, "Software Engineer");
    }

    #[test]
    fn test_short_answer_warns_but_stays_valid() {
        let report = InputValidator::validate("yes", InputKind::Answer);
        assert!(report.is_valid);
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn test_url_is_flagged() {
        let report = InputValidator::validate(
            "see my portfolio at https://example.com for details about this",
            InputKind::Answer,
        );
        assert!(report.warnings.iter().any(|w| w.contains("URL")));
    }

    #[test]
    fn test_repeated_character_run_is_flagged() {
        let report = InputValidator::validate(
            "my answer is greaaaaaaaaaaaaat and I stand by it fully",
            InputKind::Answer,
        );
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("repeated character")));
    }

    #[test]
    fn test_repetition_score() {
        assert_eq!(repetition_score("one two three four"), 0.0);
        assert!(repetition_score("spam spam spam spam spam spam") > REPETITION_THRESHOLD);
    }
}
