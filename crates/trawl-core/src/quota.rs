use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::iso_day;

/// Persisted rate-limit bookkeeping. Survives restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QuotaRecord {
    pub daily_run_count: u32,
    /// ISO day the counter belongs to.
    pub daily_run_date: Option<String>,
    /// Target URL → last successful run, unix milliseconds.
    pub group_last_run: BTreeMap<String, i64>,
    /// Unix milliseconds; 0 means no backoff.
    pub global_backoff_until: i64,
}

impl QuotaRecord {
    /// Reset the daily counter if it belongs to a different day than `now`.
    pub fn normalize(&mut self, now: i64) {
        let today = iso_day(now);
        if self.daily_run_date.as_deref() != Some(today.as_str()) {
            self.daily_run_count = 0;
            self.daily_run_date = Some(today);
        }
    }

    /// Daily count as seen at `now`, without mutating.
    pub fn runs_today(&self, now: i64) -> u32 {
        if self.daily_run_date.as_deref() == Some(iso_day(now).as_str()) {
            self.daily_run_count
        } else {
            0
        }
    }

    pub fn last_run(&self, target: &str) -> Option<i64> {
        self.group_last_run.get(target).copied()
    }
}
