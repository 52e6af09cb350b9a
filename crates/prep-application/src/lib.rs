pub mod coach;
pub mod usage;

pub use crate::coach::{
    CoachSession, DEFAULT_INITIAL_PROMPT, ExchangeCapture, SubmitOutcome, TurnOutcome,
    USAGE_LIMIT_NOTICE,
};
pub use crate::usage::UsageTracker;
