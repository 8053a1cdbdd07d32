//! Randomized scroll/pause sequence that gives page visits human timing.
//!
//! The policy is fixed and probabilistic. It does not look at content except
//! to stop when a challenge becomes visible.

use anyhow::Result;
use trawl_core::config::DelayRange;
use trawl_core::jitter::{chance, rand_between, rand_i64};
use trawl_core::Detection;

use crate::detect::detect;
use crate::page::Page;

#[derive(Debug, Clone)]
pub struct ScrollPolicy {
    pub min_cycles: u64,
    pub max_cycles: u64,
    pub forward_min: i64,
    pub forward_max: i64,
    pub micro_delay: DelayRange,
    /// Probability of a short backward "re-read" scroll after each cycle.
    pub backtrack_chance: f64,
    pub backtrack_min: i64,
    pub backtrack_max: i64,
    pub backtrack_pause: DelayRange,
    pub long_pause_every: u64,
    pub long_pause: DelayRange,
    pub final_settle: DelayRange,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            min_cycles: 15,
            max_cycles: 25,
            forward_min: 400,
            forward_max: 1000,
            micro_delay: DelayRange::new(400, 1500),
            backtrack_chance: 0.15,
            backtrack_min: 100,
            backtrack_max: 300,
            backtrack_pause: DelayRange::new(600, 1200),
            long_pause_every: 5,
            long_pause: DelayRange::new(4000, 7000),
            final_settle: DelayRange::new(2000, 4000),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollReport {
    pub planned_cycles: u64,
    pub cycles_run: u64,
    pub backtracks: u64,
    pub long_pauses: u64,
    /// Set when a challenge appeared mid-scroll and the loop bailed out.
    pub stopped_by: Option<Detection>,
}

/// Drive `page` through one randomized scroll session.
pub async fn simulate(page: &dyn Page, policy: &ScrollPolicy) -> Result<ScrollReport> {
    let planned = rand_between(policy.min_cycles, policy.max_cycles);
    let mut report = ScrollReport {
        planned_cycles: planned,
        ..Default::default()
    };
    tracing::debug!(url = page.url(), cycles = planned, "scroll session start");

    for i in 0..planned {
        if let Some(hit) = detect(page).await {
            tracing::warn!(url = page.url(), kind = %hit.kind, cycle = i, "challenge during scroll");
            report.stopped_by = Some(hit);
            return Ok(report);
        }

        page.scroll_by(rand_i64(policy.forward_min, policy.forward_max))
            .await?;
        tokio::time::sleep(policy.micro_delay.sample()).await;

        if chance(policy.backtrack_chance) {
            page.scroll_by(-rand_i64(policy.backtrack_min, policy.backtrack_max))
                .await?;
            tokio::time::sleep(policy.backtrack_pause.sample()).await;
            report.backtracks += 1;
        }

        if policy.long_pause_every > 0 && (i + 1) % policy.long_pause_every == 0 {
            tokio::time::sleep(policy.long_pause.sample()).await;
            report.long_pauses += 1;
        }

        report.cycles_run += 1;
    }

    tokio::time::sleep(policy.final_settle.sample()).await;
    Ok(report)
}
