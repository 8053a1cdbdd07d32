use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::jitter;
use crate::keywords::KeywordConfig;

/// Configuration scope: everything read from `config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub group_links: Vec<String>,
    pub keywords: KeywordConfig,
    pub limits: Limits,
    pub timings: Timings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browserless: Option<BrowserlessSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowserlessSettings {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Rate limits applied by the quota gate and session planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    pub daily_group_limit: u32,
    pub per_group_cooldown_hours: u32,
    /// Every Nth target position gets an extra long break.
    pub long_break_every: usize,
    pub global_backoff_hours: u32,
    pub max_session_targets: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            daily_group_limit: 6,
            per_group_cooldown_hours: 12,
            long_break_every: 3,
            global_backoff_hours: 24,
            max_session_targets: 4,
        }
    }
}

/// Inclusive millisecond range sampled uniformly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn sample(&self) -> Duration {
        Duration::from_millis(jitter::rand_between(self.min_ms, self.max_ms))
    }
}

/// Orchestrator pacing. All values in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timings {
    /// Wait after opening a page, approximating a human page-load pause.
    pub settle: DelayRange,
    pub inter_target: DelayRange,
    pub long_break: DelayRange,
    pub probe_interval_ms: u64,
    pub probe_attempts: u32,
    pub extraction_timeout_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle: DelayRange::new(7_000, 10_000),
            inter_target: DelayRange::new(12_000, 25_000),
            long_break: DelayRange::new(90_000, 180_000),
            probe_interval_ms: 1_000,
            probe_attempts: 15,
            extraction_timeout_ms: 180_000,
        }
    }
}

impl Timings {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }
}
