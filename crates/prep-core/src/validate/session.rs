//! Session state validation and repair.
//!
//! The hosting UI keeps session state as an untyped JSON snapshot that can
//! lose or corrupt fields across re-renders. [`SessionStateGuard`] checks a
//! snapshot against the shape of [`crate::session::SessionRecord`] and
//! repairs what it can in place, so a turn never starts from broken state.

use serde_json::{Map, Value, json};

/// Result of validating a raw session snapshot.
///
/// Missing required fields are advisory (`missing_fields` + warning);
/// only structural type errors inside present fields make the snapshot
/// invalid.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub missing_fields: Vec<String>,
    pub corrupted_fields: Vec<String>,
}

/// Result of a repair pass.
#[derive(Debug, Clone, Default)]
pub struct RepairReport {
    /// True if at least one corrective action was taken.
    pub repaired: bool,
    /// One entry per corrective action.
    pub actions: Vec<String>,
}

/// Validates and repairs raw session state snapshots.
pub struct SessionStateGuard;

const REQUIRED_FIELDS: [&str; 3] = ["conversation", "started", "job_role"];
const KNOWN_ROLES: [&str; 3] = ["system", "user", "assistant"];
const COUNTER_FIELDS: [&str; 3] = ["prompt_tokens", "completion_tokens", "total_tokens"];

impl SessionStateGuard {
    /// Validates a session snapshot without modifying it.
    pub fn validate(state: &Map<String, Value>) -> ValidationReport {
        let mut report = ValidationReport {
            is_valid: true,
            ..Default::default()
        };

        for field in REQUIRED_FIELDS {
            if !state.contains_key(field) {
                report.missing_fields.push(field.to_string());
                report
                    .warnings
                    .push(format!("Missing required session field: {field}"));
            }
        }

        if let Some(conversation) = state.get("conversation") {
            Self::validate_conversation(conversation, &mut report);
        }

        if let Some(count) = state.get("query_count") {
            if count.as_u64().is_none() {
                report.corrupted_fields.push("query_count".to_string());
                report.warnings.push("Query count is invalid".to_string());
            }
        }

        if let Some(usage) = state.get("usage") {
            Self::validate_usage(usage, &mut report);
        }

        report.is_valid = report.errors.is_empty();
        report
    }

    /// Attempts to repair a session snapshot in place.
    ///
    /// Repair is idempotent and additive: each missing required field gets
    /// a documented default, a corrupted turn counter resets to zero, and a
    /// missing or malformed usage block resets to zero defaults. Fields
    /// that validate cleanly are never touched.
    pub fn repair(state: &mut Map<String, Value>) -> RepairReport {
        let mut report = RepairReport::default();
        let validation = Self::validate(state);

        if !state.contains_key("conversation") {
            state.insert("conversation".to_string(), json!([]));
            report.actions.push("Initialized empty conversation".to_string());
        }

        if !state.contains_key("started") {
            state.insert("started".to_string(), json!(false));
            report.actions.push("Set started to false".to_string());
        }

        if !state.contains_key("job_role") {
            state.insert("job_role".to_string(), json!(""));
            report.actions.push("Initialized empty job_role".to_string());
        }

        if validation.corrupted_fields.iter().any(|f| f == "query_count") {
            state.insert("query_count".to_string(), json!(0));
            report.actions.push("Reset query_count to 0".to_string());
        }

        if !Self::usage_block_is_sound(state.get("usage")) {
            state.insert("usage".to_string(), Self::default_usage());
            report
                .actions
                .push("Reset usage counters to default values".to_string());
        }

        report.repaired = !report.actions.is_empty();
        report
    }

    /// The zeroed usage block installed by repair.
    pub fn default_usage() -> Value {
        json!({
            "prompt_tokens": 0,
            "completion_tokens": 0,
            "total_tokens": 0,
            "estimated_cost": 0.0,
        })
    }

    fn validate_conversation(conversation: &Value, report: &mut ValidationReport) {
        let Some(entries) = conversation.as_array() else {
            report.errors.push("Conversation should be a list".to_string());
            return;
        };

        for (i, entry) in entries.iter().enumerate() {
            let Some(message) = entry.as_object() else {
                report.errors.push(format!("Message {i} is not an object"));
                continue;
            };

            match message.get("role") {
                None => report.errors.push(format!("Message {i} missing 'role' field")),
                Some(role) => {
                    let known = role
                        .as_str()
                        .is_some_and(|r| KNOWN_ROLES.contains(&r));
                    if !known {
                        report
                            .warnings
                            .push(format!("Message {i} has unexpected role: {role}"));
                    }
                }
            }

            match message.get("content") {
                None => report
                    .errors
                    .push(format!("Message {i} missing 'content' field")),
                Some(content) if !content.is_string() => {
                    report.errors.push(format!("Message {i} content is not a string"));
                }
                Some(_) => {}
            }
        }
    }

    fn validate_usage(usage: &Value, report: &mut ValidationReport) {
        let Some(block) = usage.as_object() else {
            report.errors.push("Usage should be an object".to_string());
            return;
        };

        for field in COUNTER_FIELDS {
            match block.get(field) {
                None => report.warnings.push(format!("Usage missing field: {field}")),
                Some(value) => {
                    let sound = value.as_i64().is_some_and(|n| n >= 0);
                    if !sound {
                        report.warnings.push(format!("Invalid {field}: {value}"));
                    }
                }
            }
        }

        match block.get("estimated_cost") {
            None => report
                .warnings
                .push("Usage missing field: estimated_cost".to_string()),
            Some(value) => {
                let sound = value.as_f64().is_some_and(|n| n >= 0.0);
                if !sound {
                    report
                        .warnings
                        .push(format!("Invalid estimated cost: {value}"));
                }
            }
        }
    }

    // A block survives repair only if it is an object carrying all four
    // counters with the right types. Negative values pass through (see
    // DESIGN.md on counter pass-through).
    fn usage_block_is_sound(usage: Option<&Value>) -> bool {
        let Some(block) = usage.and_then(Value::as_object) else {
            return false;
        };
        COUNTER_FIELDS
            .iter()
            .all(|f| block.get(*f).is_some_and(|v| v.as_i64().is_some()))
            && block
                .get("estimated_cost")
                .is_some_and(|v| v.as_f64().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_state() -> Map<String, Value> {
        json!({
            "conversation": [
                { "role": "system", "content": "You are a coach." },
                { "role": "user", "content": "Ask me a question." },
                { "role": "assistant", "content": "Tell me about yourself." },
            ],
            "started": true,
            "job_role": "Technical Project Manager",
            "query_count": 2,
            "usage": {
                "prompt_tokens": 120,
                "completion_tokens": 80,
                "total_tokens": 200,
                "estimated_cost": 0.0036,
            },
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_valid_state_passes() {
        let report = SessionStateGuard::validate(&full_state());
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert!(report.missing_fields.is_empty());
    }

    #[test]
    fn test_missing_fields_are_advisory() {
        let state = Map::new();
        let report = SessionStateGuard::validate(&state);
        // absence alone never invalidates
        assert!(report.is_valid);
        assert_eq!(report.missing_fields.len(), 3);
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn test_malformed_message_is_error() {
        let mut state = full_state();
        state.insert(
            "conversation".to_string(),
            json!([
                "not an object",
                { "content": "no role here" },
                { "role": "user" },
                { "role": "user", "content": 42 },
            ]),
        );
        let report = SessionStateGuard::validate(&state);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 4);
    }

    #[test]
    fn test_unknown_role_is_warning_not_error() {
        let mut state = full_state();
        state.insert(
            "conversation".to_string(),
            json!([{ "role": "moderator", "content": "hm" }]),
        );
        let report = SessionStateGuard::validate(&state);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_negative_query_count_is_corrupted() {
        let mut state = full_state();
        state.insert("query_count".to_string(), json!(-5));
        let report = SessionStateGuard::validate(&state);
        assert!(report.is_valid);
        assert_eq!(report.corrupted_fields, vec!["query_count"]);
    }

    #[test]
    fn test_usage_problems_are_warnings() {
        let mut state = full_state();
        state.insert(
            "usage".to_string(),
            json!({ "prompt_tokens": -3, "estimated_cost": "free" }),
        );
        let report = SessionStateGuard::validate(&state);
        assert!(report.is_valid);
        // -3 invalid, two missing counters, bad cost
        assert_eq!(report.warnings.len(), 4);
    }

    #[test]
    fn test_repair_missing_conversation_and_bad_query_count() {
        let mut state = full_state();
        state.remove("conversation");
        state.insert("query_count".to_string(), json!(-5));

        let report = SessionStateGuard::repair(&mut state);

        assert!(report.repaired);
        assert_eq!(report.actions.len(), 2);
        assert_eq!(state.get("conversation"), Some(&json!([])));
        assert_eq!(state.get("query_count"), Some(&json!(0)));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let mut state = Map::new();
        let first = SessionStateGuard::repair(&mut state);
        assert!(first.repaired);

        let second = SessionStateGuard::repair(&mut state);
        assert!(!second.repaired);
        assert!(second.actions.is_empty());
    }

    #[test]
    fn test_repair_resets_malformed_usage_block() {
        let mut state = full_state();
        state.insert("usage".to_string(), json!("a lot"));

        let report = SessionStateGuard::repair(&mut state);

        assert!(report.repaired);
        assert_eq!(state.get("usage"), Some(&SessionStateGuard::default_usage()));
    }

    #[test]
    fn test_repair_leaves_sound_state_alone() {
        let mut state = full_state();
        let before = state.clone();
        let report = SessionStateGuard::repair(&mut state);
        assert!(!report.repaired);
        assert_eq!(state, before);
    }

    #[test]
    fn test_repaired_state_deserializes_into_record() {
        let mut state = Map::new();
        SessionStateGuard::repair(&mut state);
        state.insert("id".to_string(), json!("s-1"));
        state.insert("created_at".to_string(), json!("2026-01-01T00:00:00Z"));

        let record: crate::session::SessionRecord =
            serde_json::from_value(Value::Object(state)).unwrap();
        assert!(record.conversation.is_empty());
        assert!(!record.started);
        assert_eq!(record.query_count, 0);
    }
}
