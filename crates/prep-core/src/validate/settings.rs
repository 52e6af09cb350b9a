//! User settings validation with auto-correction.
//!
//! Settings arrive from the hosting UI as untyped JSON (slider and select
//! values). Wrong types are hard errors and are never corrected;
//! out-of-range numeric values are clamped to the nearest bound with a
//! warning; an unrecognized difficulty level is a hard error.

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::config::{Difficulty, SamplingConfig};

/// Valid closed interval for the temperature setting.
pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 1.0);
/// Valid closed interval for frequency and presence penalties.
pub const PENALTY_RANGE: (f64, f64) = (0.0, 2.0);
/// Valid closed interval for the top_p setting.
pub const TOP_P_RANGE: (f64, f64) = (0.0, 1.0);
/// Recommended closed interval for the ideal-answer word count.
pub const WORD_COUNT_RANGE: (i64, i64) = (50, 500);

/// Result of validating user settings.
#[derive(Debug, Clone)]
pub struct SettingsReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Copy of the input with out-of-range values clamped into range.
    pub corrected: Map<String, Value>,
}

/// Validator for user-adjustable settings.
pub struct SettingsValidator;

impl SettingsValidator {
    /// Validates a raw settings map, clamping out-of-range numeric values.
    pub fn validate(settings: &Map<String, Value>) -> SettingsReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut corrected = settings.clone();

        Self::check_difficulty(settings, &mut errors);
        Self::check_numeric(
            settings,
            &mut corrected,
            "temperature",
            TEMPERATURE_RANGE,
            &mut errors,
            &mut warnings,
        );
        for penalty in ["frequency_penalty", "presence_penalty"] {
            Self::check_numeric(
                settings,
                &mut corrected,
                penalty,
                PENALTY_RANGE,
                &mut errors,
                &mut warnings,
            );
        }
        Self::check_numeric(
            settings,
            &mut corrected,
            "top_p",
            TOP_P_RANGE,
            &mut errors,
            &mut warnings,
        );
        Self::check_word_count(settings, &mut errors, &mut warnings);

        SettingsReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            corrected,
        }
    }

    /// Clamps a typed sampling config into range, returning the corrected
    /// config and one warning per adjusted field.
    ///
    /// This is the typed fast path used right before issuing a remote call;
    /// [`SettingsValidator::validate`] is the boundary check for raw UI input.
    pub fn clamp_sampling(config: &SamplingConfig) -> (SamplingConfig, Vec<String>) {
        let mut corrected = config.clone();
        let mut warnings = Vec::new();

        for (name, value, range) in [
            ("temperature", &mut corrected.temperature, TEMPERATURE_RANGE),
            (
                "frequency_penalty",
                &mut corrected.frequency_penalty,
                PENALTY_RANGE,
            ),
            (
                "presence_penalty",
                &mut corrected.presence_penalty,
                PENALTY_RANGE,
            ),
            ("top_p", &mut corrected.top_p, TOP_P_RANGE),
        ] {
            if *value < range.0 {
                warnings.push(format!(
                    "{name} {value} is below valid range {range:?}, clamped"
                ));
                *value = range.0;
            } else if *value > range.1 {
                warnings.push(format!(
                    "{name} {value} is above valid range {range:?}, clamped"
                ));
                *value = range.1;
            }
        }

        (corrected, warnings)
    }

    fn check_difficulty(settings: &Map<String, Value>, errors: &mut Vec<String>) {
        let Some(value) = settings.get("difficulty") else {
            return;
        };
        match value.as_str() {
            Some(level) => {
                if Difficulty::from_str(level).is_err() {
                    errors.push(format!("Invalid difficulty level: {level}"));
                }
            }
            None => errors.push("Difficulty must be a string".to_string()),
        }
    }

    fn check_numeric(
        settings: &Map<String, Value>,
        corrected: &mut Map<String, Value>,
        name: &str,
        range: (f64, f64),
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let Some(value) = settings.get(name) else {
            return;
        };
        let Some(number) = value.as_f64() else {
            errors.push(format!("{name} must be a number"));
            return;
        };
        if number < range.0 || number > range.1 {
            warnings.push(format!("{name} {number} is outside valid range {range:?}"));
            let clamped = number.clamp(range.0, range.1);
            corrected.insert(name.to_string(), Value::from(clamped));
        }
    }

    fn check_word_count(
        settings: &Map<String, Value>,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let Some(value) = settings.get("wordcount") else {
            return;
        };
        // as_i64 rejects floats and non-numbers alike
        let Some(count) = value.as_i64() else {
            errors.push("Word count must be an integer".to_string());
            return;
        };
        if count < WORD_COUNT_RANGE.0 || count > WORD_COUNT_RANGE.1 {
            warnings.push(format!(
                "Word count {count} is outside recommended range {WORD_COUNT_RANGE:?}"
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_in_range_settings_pass_untouched() {
        let settings = map(json!({
            "temperature": 0.7,
            "frequency_penalty": 1.0,
            "presence_penalty": 1.0,
            "top_p": 0.1,
            "wordcount": 100,
            "difficulty": "Medium",
        }));
        let report = SettingsValidator::validate(&settings);
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(report.corrected, settings);
    }

    #[test]
    fn test_out_of_range_temperature_clamped_with_warning() {
        let settings = map(json!({ "temperature": 1.7 }));
        let report = SettingsValidator::validate(&settings);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.corrected.get("temperature"), Some(&json!(1.0)));
    }

    #[test]
    fn test_below_range_clamps_to_lower_bound() {
        let settings = map(json!({ "top_p": -0.5 }));
        let report = SettingsValidator::validate(&settings);
        assert_eq!(report.corrected.get("top_p"), Some(&json!(0.0)));
    }

    #[test]
    fn test_wrong_type_is_hard_error_without_correction() {
        let settings = map(json!({ "wordcount": "fifty" }));
        let report = SettingsValidator::validate(&settings);
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Word count must be an integer"]);
        assert_eq!(report.corrected.get("wordcount"), Some(&json!("fifty")));
    }

    #[test]
    fn test_unknown_difficulty_is_hard_error() {
        let settings = map(json!({ "difficulty": "Nightmare" }));
        let report = SettingsValidator::validate(&settings);
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Invalid difficulty level: Nightmare"]);
    }

    #[test]
    fn test_word_count_out_of_range_warns_without_correction() {
        let settings = map(json!({ "wordcount": 1000 }));
        let report = SettingsValidator::validate(&settings);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.corrected.get("wordcount"), Some(&json!(1000)));
    }

    #[test]
    fn test_clamp_sampling() {
        let config = SamplingConfig {
            temperature: 1.7,
            top_p: -0.1,
            ..SamplingConfig::default()
        };
        let (corrected, warnings) = SettingsValidator::clamp_sampling(&config);
        assert_eq!(corrected.temperature, 1.0);
        assert_eq!(corrected.top_p, 0.0);
        assert_eq!(warnings.len(), 2);
    }
}
