pub mod event_log;
pub mod paths;
pub mod secret_storage;
pub mod settings_storage;
pub mod turn_log;

pub use crate::event_log::{ApiCallEvent, EventLog, PerformanceStats, RateLimitReport, RateStatus};
pub use crate::paths::PrepPaths;
pub use crate::secret_storage::SecretStorage;
pub use crate::settings_storage::SettingsStorage;
pub use crate::turn_log::{TurnLog, TurnRecord};
