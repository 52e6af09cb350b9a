//! Resilient call wrapper.
//!
//! Wraps a remote operation with bounded retries and error-kind dispatch:
//! rate limits back off exponentially, timeouts retry after a fixed delay,
//! auth and all other failures return immediately. Every attempt, success
//! or failure, is reported to the structured event log.
//!
//! Calls are strictly sequential; the invoking task is blocked for the
//! whole duration including backoff sleeps, and there is no cancellation.

use std::future::Future;
use std::time::Duration;

use prep_core::{PrepError, Result};
use prep_infrastructure::event_log::{ApiCallEvent, EventLog};
use serde::Serialize;
use serde_json::Value;

const RESPONSE_SUMMARY_LEN: usize = 100;

/// Retry budget for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts (not just retries after the first).
    pub max_retries: u32,
    /// Base delay unit for backoff sleeps.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Executes remote operations with retries, backoff, and attempt logging.
pub struct ResilientCaller<'a> {
    log: &'a EventLog,
    policy: RetryPolicy,
}

impl<'a> ResilientCaller<'a> {
    pub fn new(log: &'a EventLog) -> Self {
        Self {
            log,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(log: &'a EventLog, policy: RetryPolicy) -> Self {
        Self { log, policy }
    }

    /// Invokes `operation` until it succeeds, fails permanently, or the
    /// retry budget runs out.
    ///
    /// `parameters` is attached to every attempt's log record (the event
    /// log redacts secret-bearing keys before writing).
    pub async fn call<T, F, Fut>(&self, name: &str, parameters: Value, mut operation: F) -> Result<T>
    where
        T: Serialize,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        for attempt in 1..=self.policy.max_retries {
            match operation().await {
                Ok(value) => {
                    self.record(name, attempt, parameters.clone(), None, summarize(&value));
                    return Ok(value);
                }
                Err(err) => {
                    self.record(name, attempt, parameters.clone(), Some(err.to_string()), None);

                    match backoff_delay(&err, attempt, self.policy.base_delay) {
                        Some(delay) if attempt < self.policy.max_retries => {
                            tokio::time::sleep(delay).await;
                        }
                        // permanent failure, or transient with no attempts left
                        _ => return Err(err),
                    }
                }
            }
        }

        Err(PrepError::internal("Maximum retry attempts reached"))
    }

    fn record(
        &self,
        name: &str,
        attempt: u32,
        parameters: Value,
        error: Option<String>,
        response_summary: Option<String>,
    ) {
        let event = ApiCallEvent {
            function: name.to_string(),
            attempt,
            parameters,
            success: error.is_none(),
            error,
            response_summary,
        };
        if let Err(log_err) = self.log.log_api_call(&event) {
            tracing::warn!(operation = name, error = %log_err, "failed to log call attempt");
        }
    }
}

/// How long to sleep before retrying after `error` on 1-based `attempt`,
/// or `None` when the error is not retryable.
fn backoff_delay(error: &PrepError, attempt: u32, base: Duration) -> Option<Duration> {
    match error {
        // exponential: base * 1, base * 2, base * 4, ...
        PrepError::RateLimited { .. } => Some(base * 2u32.pow(attempt.saturating_sub(1))),
        PrepError::Timeout(_) => Some(base),
        _ => None,
    }
}

fn summarize<T: Serialize>(value: &T) -> Option<String> {
    let rendered = serde_json::to_string(value).ok()?;
    if rendered.len() > RESPONSE_SUMMARY_LEN {
        let cut: String = rendered.chars().take(RESPONSE_SUMMARY_LEN).collect();
        Some(format!("{cut}..."))
    } else {
        Some(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;
    use tokio::time::Instant;

    type BoxedOp = std::pin::Pin<Box<dyn Future<Output = Result<String>>>>;

    /// Fails the first `failures` attempts with `error`, then succeeds.
    fn failing_then_ok(
        attempts: &Arc<AtomicU32>,
        failures: u32,
        error: fn() -> PrepError,
    ) -> impl FnMut() -> BoxedOp {
        let counter = attempts.clone();
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                if n <= failures {
                    Err(error())
                } else {
                    Ok("answer".to_string())
                }
            }) as BoxedOp
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_backs_off_exponentially_then_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "s").unwrap();
        let caller = ResilientCaller::new(&log);

        let attempts = Arc::new(AtomicU32::new(0));
        let op = failing_then_ok(&attempts, 2, || PrepError::rate_limited("429"));
        let start = Instant::now();
        let result = caller.call("ask_question", json!({}), op).await.unwrap();

        assert_eq!(result, "answer");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // two sleeps: base * 1 then base * 2
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhaustion_is_terminal() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "s").unwrap();
        let caller = ResilientCaller::new(&log);

        let attempts = Arc::new(AtomicU32::new(0));
        let op = failing_then_ok(&attempts, 10, || PrepError::rate_limited("429"));
        let start = Instant::now();
        let err = caller.call("ask_question", json!({}), op).await.unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // no sleep after the final attempt
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_never_retries() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "s").unwrap();
        let caller = ResilientCaller::new(&log);

        let attempts = Arc::new(AtomicU32::new(0));
        let op = failing_then_ok(&attempts, 10, || PrepError::auth("bad key"));
        let start = Instant::now();
        let err = caller.call("ask_question", json!({}), op).await.unwrap_err();

        assert!(err.is_auth());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_retries_with_fixed_delay() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "s").unwrap();
        let caller = ResilientCaller::new(&log);

        let attempts = Arc::new(AtomicU32::new(0));
        let op = failing_then_ok(&attempts, 1, || PrepError::timeout("deadline"));
        let start = Instant::now();
        let result = caller.call("ask_question", json!({}), op).await.unwrap();

        assert_eq!(result, "answer");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_terminal() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "s").unwrap();
        let caller = ResilientCaller::new(&log);

        let attempts = Arc::new(AtomicU32::new(0));
        let op = failing_then_ok(&attempts, 10, || PrepError::remote("boom"));
        let err = caller.call("ask_question", json!({}), op).await.unwrap_err();

        assert!(matches!(err, PrepError::Remote { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_is_logged() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::open(temp_dir.path(), "s").unwrap();
        let caller = ResilientCaller::new(&log);

        let attempts = Arc::new(AtomicU32::new(0));
        let op = failing_then_ok(&attempts, 2, || PrepError::rate_limited("429"));
        caller
            .call("evaluate_answer", json!({ "api_key": "sk-x" }), op)
            .await
            .unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 3);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.payload["function"], "evaluate_answer");
            assert_eq!(record.payload["attempt"], (i + 1) as u64);
            assert_eq!(record.payload["parameters"]["api_key"], "[REDACTED]");
        }
        assert_eq!(records[0].payload["success"], false);
        assert_eq!(records[2].payload["success"], true);
        assert!(records[2].payload["response_summary"].is_string());
    }

    #[test]
    fn test_backoff_delay_schedule() {
        let base = Duration::from_secs(1);
        let rate = PrepError::rate_limited("429");
        assert_eq!(backoff_delay(&rate, 1, base), Some(Duration::from_secs(1)));
        assert_eq!(backoff_delay(&rate, 2, base), Some(Duration::from_secs(2)));
        assert_eq!(backoff_delay(&rate, 3, base), Some(Duration::from_secs(4)));

        let timeout = PrepError::timeout("slow");
        assert_eq!(backoff_delay(&timeout, 3, base), Some(base));

        assert_eq!(backoff_delay(&PrepError::auth("no"), 1, base), None);
        assert_eq!(backoff_delay(&PrepError::remote("no"), 1, base), None);
    }

    #[test]
    fn test_summarize_truncates() {
        let long = "x".repeat(500);
        let summary = summarize(&long).unwrap();
        assert!(summary.len() <= RESPONSE_SUMMARY_LEN + 3);
        assert!(summary.ends_with("..."));
    }
}
