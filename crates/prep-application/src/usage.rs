//! Token usage accounting and advisory rate estimation.
//!
//! Counters accumulate by plain addition: values reported by the remote
//! are trusted and propagate unclamped (see DESIGN.md). The rate check
//! only estimates and warns; it never blocks a call.

use prep_core::Result;
use prep_core::session::{TokenUsage, UsageCounters};
use prep_infrastructure::event_log::{EventLog, RateLimitReport};

/// GPT-4o pricing: $0.01 per 1K prompt tokens.
pub const PRICE_PROMPT_PER_1K: f64 = 0.01;
/// GPT-4o pricing: $0.03 per 1K completion tokens.
pub const PRICE_COMPLETION_PER_1K: f64 = 0.03;

/// Accumulates per-call usage into session counters.
pub struct UsageTracker;

impl UsageTracker {
    /// Adds one call's usage to the session counters and updates the
    /// estimated cost from the fixed per-token rates.
    pub fn record(counters: &mut UsageCounters, usage: &TokenUsage) {
        counters.prompt_tokens += usage.prompt_tokens;
        counters.completion_tokens += usage.completion_tokens;
        counters.total_tokens += usage.total_tokens;

        let prompt_cost = usage.prompt_tokens as f64 * PRICE_PROMPT_PER_1K / 1000.0;
        let completion_cost = usage.completion_tokens as f64 * PRICE_COMPLETION_PER_1K / 1000.0;
        counters.estimated_cost += prompt_cost + completion_cost;
    }

    /// Counts calls in the recent window and reports whether the caller
    /// should consider pausing. Advisory only.
    pub fn recent_call_rate(log: &EventLog, window_minutes: i64) -> Result<RateLimitReport> {
        log.check_rate_limits(window_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut counters = UsageCounters::default();
        UsageTracker::record(
            &mut counters,
            &TokenUsage {
                prompt_tokens: 1000,
                completion_tokens: 500,
                total_tokens: 1500,
            },
        );
        UsageTracker::record(
            &mut counters,
            &TokenUsage {
                prompt_tokens: 200,
                completion_tokens: 100,
                total_tokens: 300,
            },
        );

        assert_eq!(counters.prompt_tokens, 1200);
        assert_eq!(counters.completion_tokens, 600);
        assert_eq!(counters.total_tokens, 1800);
        // 1000 prompt + 500 completion = 0.01 + 0.015; plus 200/100 = 0.002 + 0.003
        assert!((counters.estimated_cost - 0.030).abs() < 1e-9);
    }

    #[test]
    fn test_negative_values_pass_through() {
        let mut counters = UsageCounters::default();
        UsageTracker::record(
            &mut counters,
            &TokenUsage {
                prompt_tokens: -10,
                completion_tokens: 0,
                total_tokens: -10,
            },
        );
        assert_eq!(counters.prompt_tokens, -10);
        assert_eq!(counters.total_tokens, -10);
    }
}
