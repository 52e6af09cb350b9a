//! Coaching session use case.
//!
//! `CoachSession` owns everything one practice session needs: the session
//! record, validated settings, the chat backend, and the logging
//! collaborators. A turn flows through here: resilient remote call,
//! tolerant parse, usage accounting, state guard, turn persistence.
//!
//! Each session is one exclusively-owned value; hosts serving several
//! users hold one `CoachSession` per user. There are no shared globals.

use std::sync::Arc;

use prep_core::config::CoachSettings;
use prep_core::session::{Message, SessionRecord};
use prep_core::validate::session::RepairReport;
use prep_core::validate::{InputKind, InputValidator, SessionStateGuard, SettingsValidator};
use prep_core::{PrepError, Result};
use prep_infrastructure::event_log::{EventLog, PerformanceStats, RateLimitReport, RateStatus};
use prep_infrastructure::turn_log::{TurnLog, TurnRecord};
use prep_infrastructure::{PrepPaths, SecretStorage, SettingsStorage};
use prep_interaction::backend::{ChatBackend, ChatOutcome, ChatRequest};
use prep_interaction::parser::{EvaluationResult, MoodResult, ResponseKind, ResponseParser};
use prep_interaction::resilient::{ResilientCaller, RetryPolicy};
use prep_interaction::{ChatClient, prompts};
use serde::Serialize;
use serde_json::{Value, json};

use crate::usage::UsageTracker;

/// Sent when the user starts a run without a question of their own.
pub const DEFAULT_INITIAL_PROMPT: &str = "Ask me an interview question.";

/// Notice returned when the per-session submission cap is hit.
pub const USAGE_LIMIT_NOTICE: &str = "Usage limit reached for this session.";

/// The most recent request/response pair, retained for host-side debugging.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeCapture {
    pub request: ChatRequest,
    pub response: ChatOutcome,
}

/// Everything one completed turn produced for the user.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The question the submitted answer addressed.
    pub question: String,
    pub evaluation: EvaluationResult,
    pub mood: MoodResult,
    pub ideal_answer: String,
    pub improved_answer: String,
    pub next_question: String,
    /// Accumulated advisory diagnostics (input, parsing, rate estimate).
    pub warnings: Vec<String>,
}

/// Result of handling an answer submission.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The turn completed and produced the full coaching bundle.
    Completed(Box<TurnOutcome>),
    /// The usage cap was reached; no remote call was issued.
    LimitReached { notice: String },
}

/// Drives a practice session against the chat backend.
pub struct CoachSession {
    record: SessionRecord,
    settings: CoachSettings,
    backend: Arc<dyn ChatBackend>,
    event_log: EventLog,
    turn_log: TurnLog,
    policy: RetryPolicy,
    last_exchange: Option<ExchangeCapture>,
}

impl CoachSession {
    /// Creates a session from explicit collaborators.
    ///
    /// Sampling settings are clamped into range here, once, so every call
    /// issued by this session uses validated parameters.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        event_log: EventLog,
        turn_log: TurnLog,
        settings: CoachSettings,
    ) -> Self {
        let (sampling, clamp_warnings) = SettingsValidator::clamp_sampling(&settings.sampling);
        for warning in &clamp_warnings {
            tracing::warn!(%warning, "sampling setting corrected");
        }

        Self {
            record: SessionRecord::new(),
            settings: CoachSettings { sampling, ..settings },
            backend,
            event_log,
            turn_log,
            policy: RetryPolicy::default(),
            last_exchange: None,
        }
    }

    /// Builds a session from the process environment: credential from
    /// secret.json or `OPENAI_API_KEY`, optional defaults from config.toml,
    /// logs under the platform config directory.
    ///
    /// A missing credential is fatal: no session starts without one.
    pub fn from_env() -> Result<Self> {
        let secret_storage =
            SecretStorage::new().map_err(|e| PrepError::config(e.to_string()))?;
        let (credentials, credential_warnings) = secret_storage.resolve_credentials()?;
        for warning in &credential_warnings {
            tracing::warn!(%warning, "credential check");
        }

        let config_file = PrepPaths::config_file().map_err(|e| PrepError::config(e.to_string()))?;
        let mut settings = SettingsStorage::new(config_file).load()?.unwrap_or_default();
        if let Some(model) = &credentials.model_name {
            settings.sampling.model = model.clone();
        }

        let logs_dir = PrepPaths::logs_dir().map_err(|e| PrepError::config(e.to_string()))?;
        let turn_log_file =
            PrepPaths::turn_log_file().map_err(|e| PrepError::config(e.to_string()))?;

        let record = SessionRecord::new();
        let event_log = EventLog::open(&logs_dir, record.id.clone())?;
        let turn_log = TurnLog::new(turn_log_file);
        let client = ChatClient::from_credentials(&credentials);

        let mut session = Self::new(Arc::new(client), event_log, turn_log, settings);
        session.record = record;
        Ok(session)
    }

    /// Overrides the retry policy (mainly for tests and hosts with their
    /// own patience budget).
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ============================================================================
    // Turn flow
    // ============================================================================

    /// Starts a new practice run and returns the first interview question.
    ///
    /// The session record is fully replaced; any previous conversation is
    /// gone after this call.
    pub async fn start_practice(
        &mut self,
        job_role: &str,
        custom_question: Option<&str>,
    ) -> Result<String> {
        let input = InputValidator::validate(job_role, InputKind::JobRole);
        if !input.is_valid {
            return Err(PrepError::validation("Please enter a job role"));
        }

        if let Err(err) = self.event_log.log_user_interaction(
            "start_practice",
            json!({ "job_role": input.cleaned.clone(), "warnings": input.warnings.clone() }),
        ) {
            tracing::warn!(error = %err, "failed to log interaction");
        }

        self.record.reset();
        self.record.job_role = input.cleaned.clone();
        self.record.started = true;

        self.record.push(Message::system(prompts::system_prompt(
            &input.cleaned,
            self.settings.difficulty,
        )));
        let initial = custom_question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(DEFAULT_INITIAL_PROMPT);
        self.record.push(Message::user(initial));

        let outcome = self
            .ask("get_ai_response", self.record.conversation.clone())
            .await?;
        let parsed = ResponseParser::parse(&outcome.content, ResponseKind::Question);
        if !parsed.is_valid {
            return Err(PrepError::validation("The coach returned an empty question"));
        }

        let question = parsed.as_text().unwrap_or_default().to_string();
        self.record.push(Message::assistant(question.clone()));
        self.guard_record();

        Ok(question)
    }

    /// Processes one answer submission.
    ///
    /// Produces the full coaching bundle: evaluation, interviewer mood,
    /// ideal and improved answers, and the next question. Once the usage
    /// cap is reached the submission is refused up front and no remote
    /// call is issued. Failures of the follow-up calls (evaluation, mood,
    /// ideal, improved) degrade to defaults with warnings; only a failed
    /// conversation call aborts the turn.
    pub async fn submit_answer(&mut self, answer: &str) -> Result<SubmitOutcome> {
        self.guard_record();

        if !self.record.started || self.record.conversation.is_empty() {
            return Err(PrepError::validation("No active practice session"));
        }

        if self.record.limit_reached() {
            if let Err(err) = self.event_log.log_user_interaction(
                "submit_answer_blocked",
                json!({ "query_count": self.record.query_count }),
            ) {
                tracing::warn!(error = %err, "failed to log interaction");
            }
            return Ok(SubmitOutcome::LimitReached {
                notice: USAGE_LIMIT_NOTICE.to_string(),
            });
        }

        let input = InputValidator::validate(answer, InputKind::Answer);
        if !input.is_valid {
            return Err(PrepError::validation(
                "Please enter your answer before submitting.",
            ));
        }

        self.record.query_count += 1;
        let mut warnings = input.warnings;

        // advisory only: a busy window recommends a pause, nothing more
        match UsageTracker::recent_call_rate(&self.event_log, 1) {
            Ok(report) if report.status == RateStatus::Warning => {
                if let Some(message) = report.message {
                    warnings.push(format!("{message}. API calls may be throttled."));
                }
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "rate estimate failed"),
        }

        let question = self
            .record
            .last_assistant_message()
            .unwrap_or_default()
            .to_string();
        self.record.push(Message::user(input.cleaned.clone()));

        let outcome = self
            .ask("get_ai_response", self.record.conversation.clone())
            .await?;
        let parsed = ResponseParser::parse(&outcome.content, ResponseKind::Question);
        warnings.extend(parsed.errors.clone());
        warnings.extend(parsed.warnings.clone());
        let next_question = parsed.as_text().unwrap_or_default().to_string();
        self.record.push(Message::assistant(next_question.clone()));

        let evaluation = self
            .evaluate_answer(&question, &input.cleaned, &mut warnings)
            .await;
        let mood = self.analyze_mood(&next_question, &mut warnings).await;
        let ideal_answer = self.generate_ideal_answer(&question, &mut warnings).await;
        let improved_answer = self
            .generate_improved_answer(&question, &input.cleaned, &mut warnings)
            .await;

        let turn = TurnRecord {
            job_role: self.record.job_role.clone(),
            difficulty: self.settings.difficulty.to_string(),
            question: question.clone(),
            user_answer: input.cleaned,
            model_feedback: evaluation.feedback.clone(),
            mood_feedback: mood.label.clone(),
            mood_explanation: mood.explanation.clone(),
            scores: evaluation.scores.clone(),
            ideal_answer: ideal_answer.clone(),
            improved_user_answer: improved_answer.clone(),
        };
        if let Err(err) = self.turn_log.append(&turn) {
            tracing::warn!(error = %err, "failed to persist turn");
            warnings.push("This turn could not be saved to the practice log".to_string());
        }

        self.guard_record();

        Ok(SubmitOutcome::Completed(Box::new(TurnOutcome {
            question,
            evaluation,
            mood,
            ideal_answer,
            improved_answer,
            next_question,
            warnings,
        })))
    }

    /// Discards the session and installs a fresh default record.
    pub fn reset(&mut self) {
        self.record.reset();
        self.last_exchange = None;
    }

    // ============================================================================
    // Follow-up calls (each degrades to a default on failure)
    // ============================================================================

    async fn evaluate_answer(
        &mut self,
        question: &str,
        answer: &str,
        warnings: &mut Vec<String>,
    ) -> EvaluationResult {
        let prompt = prompts::evaluation_prompt(question, answer);
        match self.ask("evaluate_answer", vec![Message::user(prompt)]).await {
            Ok(outcome) => {
                let parsed = ResponseParser::parse(&outcome.content, ResponseKind::Evaluation);
                warnings.extend(parsed.errors.clone());
                warnings.extend(parsed.warnings.clone());
                parsed.as_evaluation().cloned().unwrap_or_default()
            }
            Err(err) => {
                warnings.push(format!("Evaluation failed: {}", err.user_message()));
                EvaluationResult::default()
            }
        }
    }

    async fn analyze_mood(&mut self, message: &str, warnings: &mut Vec<String>) -> MoodResult {
        let prompt = prompts::mood_prompt(message);
        match self.ask("analyze_mood", vec![Message::user(prompt)]).await {
            Ok(outcome) => {
                let parsed = ResponseParser::parse(&outcome.content, ResponseKind::Mood);
                warnings.extend(parsed.errors.clone());
                warnings.extend(parsed.warnings.clone());
                parsed.as_mood().cloned().unwrap_or_default()
            }
            Err(err) => {
                warnings.push(format!("Mood analysis failed: {}", err.user_message()));
                MoodResult {
                    label: "Error".to_string(),
                    explanation: err.user_message(),
                }
            }
        }
    }

    async fn generate_ideal_answer(
        &mut self,
        question: &str,
        warnings: &mut Vec<String>,
    ) -> String {
        let prompt = prompts::ideal_answer_prompt(
            question,
            &self.record.job_role,
            self.settings.ideal_answer_word_count,
        );
        match self
            .ask("generate_ideal_answer", vec![Message::user(prompt)])
            .await
        {
            Ok(outcome) => {
                let parsed = ResponseParser::parse(&outcome.content, ResponseKind::IdealAnswer);
                warnings.extend(parsed.warnings.clone());
                parsed.as_text().unwrap_or_default().to_string()
            }
            Err(err) => {
                warnings.push(format!("Ideal answer generation failed: {}", err.user_message()));
                String::new()
            }
        }
    }

    async fn generate_improved_answer(
        &mut self,
        question: &str,
        answer: &str,
        warnings: &mut Vec<String>,
    ) -> String {
        let prompt = prompts::improved_answer_prompt(
            question,
            answer,
            self.settings.ideal_answer_word_count,
        );
        match self
            .ask("generate_improved_answer", vec![Message::user(prompt)])
            .await
        {
            Ok(outcome) => {
                let parsed = ResponseParser::parse(&outcome.content, ResponseKind::IdealAnswer);
                warnings.extend(parsed.warnings.clone());
                parsed.as_text().unwrap_or_default().to_string()
            }
            Err(err) => {
                warnings.push(format!("Improved answer generation failed: {}", err.user_message()));
                String::new()
            }
        }
    }

    // ============================================================================
    // Plumbing
    // ============================================================================

    /// Issues one remote call through the retry wrapper, then records
    /// usage and the debug capture.
    async fn ask(&mut self, operation: &str, messages: Vec<Message>) -> Result<ChatOutcome> {
        let request = ChatRequest {
            sampling: self.settings.sampling.clone(),
            messages,
        };
        let parameters = json!({
            "model": request.sampling.model,
            "temperature": request.sampling.temperature,
            "top_p": request.sampling.top_p,
            "max_tokens": request.sampling.max_tokens,
            "message_count": request.messages.len(),
        });

        let caller = ResilientCaller::with_policy(&self.event_log, self.policy);
        let backend = Arc::clone(&self.backend);
        let outcome = caller
            .call(operation, parameters, || {
                let backend = Arc::clone(&backend);
                let request = request.clone();
                async move { backend.complete(&request).await }
            })
            .await?;

        UsageTracker::record(&mut self.record.usage, &outcome.usage);
        self.last_exchange = Some(ExchangeCapture {
            request,
            response: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Opportunistic consistency check: serialize the record, run the
    /// guard over it, and reload when a repair changed anything.
    fn guard_record(&mut self) {
        let Ok(Value::Object(mut raw)) = serde_json::to_value(&self.record) else {
            return;
        };

        let validation = SessionStateGuard::validate(&raw);
        if validation.is_valid
            && validation.missing_fields.is_empty()
            && validation.corrupted_fields.is_empty()
        {
            return;
        }

        let repair = SessionStateGuard::repair(&mut raw);
        if repair.repaired {
            if let Ok(restored) = serde_json::from_value::<SessionRecord>(Value::Object(raw)) {
                self.record = restored;
            }
            if let Err(err) = self
                .event_log
                .log_error("session state repaired", json!({ "actions": repair.actions }))
            {
                tracing::warn!(error = %err, "failed to log repair");
            }
        }
    }

    /// Replaces the session record with a snapshot handed back by the
    /// host, repairing it first.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the snapshot is corrupted beyond
    /// what repair covers (e.g. non-string message content).
    pub fn restore(&mut self, mut raw: serde_json::Map<String, Value>) -> Result<RepairReport> {
        let report = SessionStateGuard::repair(&mut raw);
        self.record = serde_json::from_value(Value::Object(raw))
            .map_err(|_| PrepError::validation("Session state is corrupted beyond repair"))?;
        Ok(report)
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn settings(&self) -> &CoachSettings {
        &self.settings
    }

    /// The most recent request/response pair, for host-side debug panes.
    pub fn last_exchange(&self) -> Option<&ExchangeCapture> {
        self.last_exchange.as_ref()
    }

    /// Advisory rate estimate over the recent window.
    pub fn rate_status(&self, window_minutes: i64) -> Result<RateLimitReport> {
        UsageTracker::recent_call_rate(&self.event_log, window_minutes)
    }

    /// Aggregate call statistics for this session's log.
    pub fn performance_stats(&self) -> Result<PerformanceStats> {
        self.event_log.performance_stats()
    }
}
