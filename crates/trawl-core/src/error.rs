use thiserror::Error;

use crate::types::format_millis;

/// Why the quota gate refused a run. Expected, not exceptional.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("daily_quota_reached")]
    DailyQuotaReached,
    #[error("global_backoff_active")]
    GlobalBackoffActive {
        /// Unix milliseconds when the backoff lifts.
        until: i64,
    },
    #[error("all_targets_cooldown")]
    AllTargetsCooldown,
}

impl Denial {
    /// Earliest time a retry could succeed, when known.
    pub fn retry_after(&self) -> Option<i64> {
        match self {
            Denial::GlobalBackoffActive { until } => Some(*until),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self.retry_after() {
            Some(until) => format!("{self} (until {})", format_millis(until)),
            None => self.to_string(),
        }
    }
}

/// Reasons a start-session command is rejected.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("Already scraping")]
    AlreadyRunning,
    #[error("No groups configured")]
    NoTargets,
    #[error("Start failed: {0}")]
    Denied(Denial),
    #[error("Start failed: {0:#}")]
    Storage(#[from] anyhow::Error),
}
