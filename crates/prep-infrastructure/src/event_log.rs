//! Structured event log.
//!
//! An append-only JSON Lines sink for application events: API call
//! attempts, user interactions, and errors. Each record carries the session
//! id and an RFC 3339 timestamp so the log can be queried by time window
//! for the advisory rate check and the performance summary.
//!
//! This is a data store, not a diagnostic channel; process diagnostics go
//! through `tracing`.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use prep_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Advisory warning threshold for calls per window (75% of an assumed
/// 200 RPM upstream limit).
pub const RATE_WARNING_THRESHOLD: usize = 150;

/// Substrings that mark a parameter key as secret-bearing.
const SECRET_KEY_MARKERS: [&str; 4] = ["key", "secret", "token", "password"];

/// Event classification for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    ApiCall,
    UserInteraction,
    Error,
}

/// One structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub session_id: String,
    pub timestamp: String,
    pub category: EventCategory,
    pub payload: Value,
}

/// One remote call attempt, as reported by the call pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ApiCallEvent {
    /// Logical operation name (e.g. "evaluate_answer").
    pub function: String,
    /// 1-based attempt number within the retry loop.
    pub attempt: u32,
    /// Call parameters; secret-bearing keys are redacted before writing.
    pub parameters: Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Truncated response text for successful calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_summary: Option<String>,
}

/// Aggregate call statistics over the whole log.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PerformanceStats {
    pub total_calls: usize,
    pub calls_by_function: HashMap<String, usize>,
    /// Percentage of successful calls, 0.0 when the log is empty.
    pub success_rate: f64,
}

/// Outcome of the advisory rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateStatus {
    Ok,
    Warning,
}

/// Advisory rate-check report. Never blocks anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitReport {
    pub status: RateStatus,
    pub calls: usize,
    pub window_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One entry of the hourly call timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: String,
    pub function: String,
    pub success: bool,
}

/// Append-only JSON Lines event sink with time-window queries.
pub struct EventLog {
    dir: PathBuf,
    file: PathBuf,
    session_id: String,
}

impl EventLog {
    /// Opens (or creates) the event log in `dir` for the given session.
    ///
    /// The directory is created when missing; records are appended to a
    /// per-day file so old days stay queryable.
    pub fn open(dir: impl AsRef<Path>, session_id: impl Into<String>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let file = dir.join(format!("app_{}.jsonl", Utc::now().format("%Y%m%d")));
        Ok(Self {
            dir,
            file,
            session_id: session_id.into(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Appends one API call attempt. Parameters are redacted here so
    /// secrets can never reach disk regardless of the caller.
    pub fn log_api_call(&self, event: &ApiCallEvent) -> Result<()> {
        let mut payload = serde_json::to_value(event)?;
        if let Some(params) = payload.get_mut("parameters") {
            *params = redact_secrets(params.clone());
        }
        self.append(EventCategory::ApiCall, payload)
    }

    /// Appends a user interaction (e.g. "start_practice", "submit_answer").
    pub fn log_user_interaction(&self, action: &str, data: Value) -> Result<()> {
        self.append(EventCategory::UserInteraction, json!({ "action": action, "data": data }))
    }

    /// Appends an application error with context.
    pub fn log_error(&self, error: &str, context: Value) -> Result<()> {
        self.append(EventCategory::Error, json!({ "error": error, "context": context }))
    }

    fn append(&self, category: EventCategory, payload: Value) -> Result<()> {
        let record = EventRecord {
            session_id: self.session_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
            category,
            payload,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Reads every record from every log file in the directory, oldest
    /// file first. Unparseable lines are skipped.
    pub fn read_all(&self) -> Result<Vec<EventRecord>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("app_") && n.ends_with(".jsonl"))
            })
            .collect();
        files.sort();

        let mut records = Vec::new();
        for path in files {
            let content = fs::read_to_string(&path)?;
            for line in content.lines() {
                if let Ok(record) = serde_json::from_str::<EventRecord>(line) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// Returns API call records with timestamps inside `[now - window, now]`.
    pub fn recent_api_calls(&self, window: Duration) -> Result<Vec<EventRecord>> {
        let cutoff = Utc::now() - window;
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.category == EventCategory::ApiCall)
            .filter(|r| parse_timestamp(&r.timestamp).is_some_and(|t| t >= cutoff))
            .collect())
    }

    /// Counts recent API calls and reports whether the caller should
    /// consider pausing. Advisory only.
    pub fn check_rate_limits(&self, window_minutes: i64) -> Result<RateLimitReport> {
        let calls = self
            .recent_api_calls(Duration::minutes(window_minutes))?
            .len();

        if calls > RATE_WARNING_THRESHOLD {
            return Ok(RateLimitReport {
                status: RateStatus::Warning,
                calls,
                window_minutes,
                message: Some(format!(
                    "High API usage detected: {calls} calls in the last {window_minutes} minute(s)"
                )),
            });
        }

        Ok(RateLimitReport {
            status: RateStatus::Ok,
            calls,
            window_minutes,
            message: None,
        })
    }

    /// Aggregates call counts and success rate over the whole log.
    pub fn performance_stats(&self) -> Result<PerformanceStats> {
        let calls: Vec<EventRecord> = self
            .read_all()?
            .into_iter()
            .filter(|r| r.category == EventCategory::ApiCall)
            .collect();

        if calls.is_empty() {
            return Ok(PerformanceStats::default());
        }

        let mut by_function: HashMap<String, usize> = HashMap::new();
        let mut successes = 0usize;
        for record in &calls {
            let function = record
                .payload
                .get("function")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            *by_function.entry(function).or_insert(0) += 1;
            if record
                .payload
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(true)
            {
                successes += 1;
            }
        }

        Ok(PerformanceStats {
            total_calls: calls.len(),
            calls_by_function: by_function,
            success_rate: successes as f64 / calls.len() as f64 * 100.0,
        })
    }

    /// Timeline of API calls over the last `hours`, oldest first.
    pub fn call_timeline(&self, hours: i64) -> Result<Vec<TimelineEntry>> {
        let mut entries: Vec<TimelineEntry> = self
            .recent_api_calls(Duration::hours(hours))?
            .into_iter()
            .map(|record| TimelineEntry {
                function: record
                    .payload
                    .get("function")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                success: record
                    .payload
                    .get("success")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
                timestamp: record.timestamp,
            })
            .collect();
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(entries)
    }
}

/// Replaces the value of any key that looks secret-bearing with
/// `"[REDACTED]"`, recursively.
pub fn redact_secrets(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| {
                    let lower = key.to_lowercase();
                    if SECRET_KEY_MARKERS.iter().any(|m| lower.contains(m)) {
                        (key, Value::String("[REDACTED]".to_string()))
                    } else {
                        (key, redact_secrets(inner))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact_secrets).collect()),
        other => other,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn call_event(function: &str, attempt: u32, success: bool) -> ApiCallEvent {
        ApiCallEvent {
            function: function.to_string(),
            attempt,
            parameters: json!({ "model": "gpt-4o", "api_key": "sk-very-secret" }),
            success,
            error: if success { None } else { Some("boom".to_string()) },
            response_summary: None,
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "session-1").unwrap();

        log.log_api_call(&call_event("ask_question", 1, true)).unwrap();
        log.log_user_interaction("start_practice", json!({ "job_role": "SRE" }))
            .unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].session_id, "session-1");
        assert_eq!(records[0].category, EventCategory::ApiCall);
        assert_eq!(records[1].category, EventCategory::UserInteraction);
    }

    #[test]
    fn test_secrets_never_reach_disk() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "session-1").unwrap();

        log.log_api_call(&call_event("ask_question", 1, true)).unwrap();

        let records = log.read_all().unwrap();
        let params = &records[0].payload["parameters"];
        assert_eq!(params["api_key"], json!("[REDACTED]"));
        assert_eq!(params["model"], json!("gpt-4o"));
    }

    #[test]
    fn test_recent_calls_and_rate_check() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "session-1").unwrap();

        for attempt in 1..=3 {
            log.log_api_call(&call_event("evaluate_answer", attempt, true))
                .unwrap();
        }

        let report = log.check_rate_limits(1).unwrap();
        assert_eq!(report.status, RateStatus::Ok);
        assert_eq!(report.calls, 3);
        assert!(report.message.is_none());
    }

    #[test]
    fn test_performance_stats() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "session-1").unwrap();

        log.log_api_call(&call_event("ask_question", 1, true)).unwrap();
        log.log_api_call(&call_event("ask_question", 1, true)).unwrap();
        log.log_api_call(&call_event("analyze_mood", 1, false)).unwrap();
        // non-call records are ignored by the stats
        log.log_error("oops", json!({})).unwrap();

        let stats = log.performance_stats().unwrap();
        assert_eq!(stats.total_calls, 3);
        assert_eq!(stats.calls_by_function["ask_question"], 2);
        assert_eq!(stats.calls_by_function["analyze_mood"], 1);
        assert!((stats.success_rate - 66.666).abs() < 0.1);
    }

    #[test]
    fn test_empty_log_stats() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "session-1").unwrap();
        let stats = log.performance_stats().unwrap();
        assert_eq!(stats.total_calls, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_call_timeline() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "session-1").unwrap();

        log.log_api_call(&call_event("ask_question", 1, true)).unwrap();
        log.log_api_call(&call_event("analyze_mood", 1, false)).unwrap();

        let timeline = log.call_timeline(24).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].function, "ask_question");
        assert!(!timeline[1].success);
    }

    #[test]
    fn test_redact_nested_secrets() {
        let redacted = redact_secrets(json!({
            "outer": { "Authorization-Token": "abc", "temperature": 0.7 },
            "api_key": "sk-1",
        }));
        assert_eq!(redacted["outer"]["Authorization-Token"], json!("[REDACTED]"));
        assert_eq!(redacted["outer"]["temperature"], json!(0.7));
        assert_eq!(redacted["api_key"], json!("[REDACTED]"));
    }
}
