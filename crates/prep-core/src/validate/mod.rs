//! Validation and repair routines.
//!
//! Everything in here is tolerant: malformed data degrades to warnings
//! and best-effort defaults wherever the contract allows it, and only
//! genuinely unusable input is rejected outright.

pub mod input;
pub mod session;
pub mod settings;

pub use input::{InputKind, InputReport, InputValidator};
pub use session::{RepairReport, SessionStateGuard, ValidationReport};
pub use settings::{SettingsReport, SettingsValidator};
