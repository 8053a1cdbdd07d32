//! Daily / per-target / global rate limits.

use anyhow::Result;
use std::sync::Arc;

use trawl_core::config::Limits;
use trawl_core::repo::QuotaRepository;
use trawl_core::{now_millis, Denial, QuotaRecord, MILLIS_PER_HOUR};

/// Result of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Targets still outside their cooldown, in input order.
    Allowed(Vec<String>),
    Denied(Denial),
}

impl Verdict {
    pub fn into_result(self) -> Result<Vec<String>, Denial> {
        match self {
            Verdict::Allowed(targets) => Ok(targets),
            Verdict::Denied(denial) => Err(denial),
        }
    }
}

#[derive(Clone)]
pub struct QuotaGate {
    repo: Arc<dyn QuotaRepository>,
    limits: Limits,
}

impl QuotaGate {
    pub fn new(repo: Arc<dyn QuotaRepository>, limits: Limits) -> Self {
        Self { repo, limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn evaluate(&self, candidates: &[String]) -> Result<Verdict> {
        let record = self.repo.load()?;
        Ok(evaluate_at(&record, &self.limits, candidates, now_millis()))
    }

    /// Bookkeeping after targets completed successfully.
    pub fn record_run(&self, targets: &[String]) -> Result<QuotaRecord> {
        let now = now_millis();
        let added = targets.len() as u32;
        self.repo.update(&mut |rec| {
            rec.normalize(now);
            rec.daily_run_count += added;
            for t in targets {
                rec.group_last_run.insert(t.clone(), now);
            }
        })
    }

    /// Suspend all runs for `hours` from now. Returns the new deadline.
    pub fn engage_global_backoff(&self, hours: u32) -> Result<i64> {
        let until = now_millis() + i64::from(hours) * MILLIS_PER_HOUR;
        self.repo.update(&mut |rec| rec.global_backoff_until = until)?;
        tracing::warn!(hours, until, "global backoff engaged");
        Ok(until)
    }
}

/// Pure evaluation against a record snapshot. Never mutates the record.
pub fn evaluate_at(
    record: &QuotaRecord,
    limits: &Limits,
    candidates: &[String],
    now: i64,
) -> Verdict {
    if record.runs_today(now) >= limits.daily_group_limit {
        return Verdict::Denied(Denial::DailyQuotaReached);
    }
    if now < record.global_backoff_until {
        return Verdict::Denied(Denial::GlobalBackoffActive {
            until: record.global_backoff_until,
        });
    }

    let cooldown = i64::from(limits.per_group_cooldown_hours) * MILLIS_PER_HOUR;
    let eligible: Vec<String> = candidates
        .iter()
        .filter(|t| match record.last_run(t) {
            Some(last) => now - last > cooldown,
            None => true,
        })
        .cloned()
        .collect();

    if eligible.is_empty() && !candidates.is_empty() {
        return Verdict::Denied(Denial::AllTargetsCooldown);
    }
    Verdict::Allowed(eligible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trawl_core::iso_day;
    use trawl_store::{FileQuotaStore, StorePaths};

    const NOW: i64 = 1_709_640_000_000;

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| format!("https://fb.test/groups/{n}")).collect()
    }

    fn today(count: u32) -> QuotaRecord {
        QuotaRecord {
            daily_run_count: count,
            daily_run_date: Some(iso_day(NOW)),
            ..Default::default()
        }
    }

    #[test]
    fn daily_limit_beats_everything() {
        let mut rec = today(6);
        rec.global_backoff_until = NOW + 1000;
        let t = targets(&["a"]);
        rec.group_last_run.insert(t[0].clone(), NOW);
        assert_eq!(
            evaluate_at(&rec, &Limits::default(), &t, NOW),
            Verdict::Denied(Denial::DailyQuotaReached)
        );
    }

    #[test]
    fn yesterdays_count_does_not_deny() {
        let rec = QuotaRecord {
            daily_run_count: 99,
            daily_run_date: Some(iso_day(NOW - 24 * MILLIS_PER_HOUR)),
            ..Default::default()
        };
        let t = targets(&["a"]);
        assert_eq!(
            evaluate_at(&rec, &Limits::default(), &t, NOW),
            Verdict::Allowed(t.clone())
        );
    }

    #[test]
    fn active_backoff_denies_with_deadline() {
        let mut rec = today(0);
        rec.global_backoff_until = NOW + 5;
        assert_eq!(
            evaluate_at(&rec, &Limits::default(), &targets(&["a"]), NOW),
            Verdict::Denied(Denial::GlobalBackoffActive { until: NOW + 5 })
        );
    }

    #[test]
    fn cooldown_filters_recent_targets() {
        let t = targets(&["a", "b", "c"]);
        let mut rec = today(1);
        rec.group_last_run.insert(t[0].clone(), NOW - MILLIS_PER_HOUR);
        rec.group_last_run.insert(t[1].clone(), NOW - 13 * MILLIS_PER_HOUR);
        assert_eq!(
            evaluate_at(&rec, &Limits::default(), &t, NOW),
            Verdict::Allowed(vec![t[1].clone(), t[2].clone()])
        );
    }

    #[test]
    fn all_in_cooldown_is_denied() {
        let t = targets(&["a", "b"]);
        let mut rec = today(1);
        for target in &t {
            rec.group_last_run.insert(target.clone(), NOW - 60_000);
        }
        assert_eq!(
            evaluate_at(&rec, &Limits::default(), &t, NOW),
            Verdict::Denied(Denial::AllTargetsCooldown)
        );
    }

    #[test]
    fn empty_candidates_allowed_empty() {
        assert_eq!(
            evaluate_at(&today(0), &Limits::default(), &[], NOW),
            Verdict::Allowed(vec![])
        );
    }

    fn file_gate() -> (tempfile::TempDir, Arc<FileQuotaStore>, QuotaGate) {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Arc::new(FileQuotaStore::new(&StorePaths::discover(tmp.path())));
        let gate = QuotaGate::new(repo.clone(), Limits::default());
        (tmp, repo, gate)
    }

    #[test]
    fn record_run_counts_targets_and_stamps_them() {
        let (_tmp, repo, gate) = file_gate();
        let t = targets(&["a", "b"]);
        gate.record_run(&t[..1]).unwrap();
        gate.record_run(&t[1..]).unwrap();

        let rec = repo.load().unwrap();
        assert_eq!(rec.daily_run_count, 2);
        assert_eq!(rec.daily_run_date, Some(iso_day(now_millis())));
        assert!(rec.last_run(&t[0]).is_some());
        assert!(rec.last_run(&t[1]).is_some());

        // Both now cooling down.
        assert_eq!(
            gate.evaluate(&t).unwrap(),
            Verdict::Denied(Denial::AllTargetsCooldown)
        );
    }

    #[test]
    fn evaluate_has_no_side_effects() {
        let (_tmp, repo, gate) = file_gate();
        repo.save(&today(6)).unwrap();
        let before = repo.load().unwrap();
        let _ = gate.evaluate(&targets(&["a"])).unwrap();
        assert_eq!(repo.load().unwrap(), before);
    }

    #[test]
    fn backoff_sets_deadline_hours_ahead() {
        let (_tmp, repo, gate) = file_gate();
        let start = now_millis();
        let until = gate.engage_global_backoff(24).unwrap();
        assert!(until >= start + 24 * MILLIS_PER_HOUR);
        assert_eq!(repo.load().unwrap().global_backoff_until, until);
        assert!(matches!(
            gate.evaluate(&targets(&["a"])).unwrap(),
            Verdict::Denied(Denial::GlobalBackoffActive { .. })
        ));
    }
}
