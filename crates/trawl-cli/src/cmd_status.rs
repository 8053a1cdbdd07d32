use serde::Serialize;

use trawl_conductor::runner::status_file::read_status;
use trawl_conductor::SessionState;
use trawl_core::config::Limits;
use trawl_core::repo::QuotaRepository;
use trawl_core::{format_millis, now_millis, QuotaRecord};
use trawl_store::{ContentStore, FileQuotaStore, SettingsFile, StorePaths};

#[derive(Debug, Serialize)]
struct StatusReport {
    session: SessionState,
    quota: QuotaRecord,
    runs_today: u32,
    daily_limit: u32,
    stored_posts: usize,
}

pub fn execute(paths: &StorePaths, json: bool) -> anyhow::Result<()> {
    let report = gather(paths)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report, now_millis()));
    }
    Ok(())
}

fn gather(paths: &StorePaths) -> anyhow::Result<StatusReport> {
    let limits = SettingsFile::new(paths)
        .load()
        .map(|s| s.limits)
        .unwrap_or_else(|_| Limits::default());
    let quota = FileQuotaStore::new(paths).load()?;
    Ok(StatusReport {
        session: read_status(&paths.status_json)?,
        runs_today: quota.runs_today(now_millis()),
        quota,
        daily_limit: limits.daily_group_limit,
        stored_posts: ContentStore::new(paths).len()?,
    })
}

fn render(report: &StatusReport, now: i64) -> String {
    let s = &report.session;
    let mut out = String::new();
    if s.active {
        out.push_str(&format!(
            "Session {}: {:?} (group {})\n",
            s.session_id,
            s.phase,
            s.progress()
        ));
        if !s.current_target_url.is_empty() {
            out.push_str(&format!("Target: {}\n", s.current_target_url));
        }
    } else {
        out.push_str("Session: idle\n");
    }
    if !s.status_message.is_empty() {
        out.push_str(&format!("Status: {}\n", s.status_message));
    }
    out.push_str(&format!(
        "Runs today: {}/{}\n",
        report.runs_today, report.daily_limit
    ));
    if report.quota.global_backoff_until > now {
        out.push_str(&format!(
            "Backoff until: {}\n",
            format_millis(report.quota.global_backoff_until)
        ));
    }
    out.push_str(&format!("Stored posts: {}\n", report.stored_posts));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use trawl_core::repo::PostRepository;
    use trawl_core::Post;

    #[test]
    fn empty_store_reports_idle() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::discover(tmp.path());
        let report = gather(&paths).unwrap();
        assert!(!report.session.active);
        assert_eq!(report.stored_posts, 0);
        assert_eq!(report.daily_limit, 6);

        let text = render(&report, now_millis());
        assert!(text.starts_with("Session: idle\n"));
        assert!(text.contains("Runs today: 0/6"));
        assert!(!text.contains("Backoff"));
    }

    #[test]
    fn active_session_and_backoff_rendered() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::discover(tmp.path());
        let mut session = SessionState::begin(3, vec!["a".into(), "b".into()]).unwrap();
        session.current_target_url = "a".into();
        trawl_conductor::runner::status_file::write_status(&paths.status_json, &session).unwrap();
        FileQuotaStore::new(&paths)
            .save(&QuotaRecord {
                global_backoff_until: now_millis() + 60_000,
                ..Default::default()
            })
            .unwrap();
        ContentStore::new(&paths)
            .merge(&[Post {
                id: "1".into(),
                text: "hiring react dev".into(),
                author: "Ana".into(),
                url: "N/A".into(),
                timestamp: 0,
                score: 4,
                matched_keywords: vec![],
            }])
            .unwrap();

        let report = gather(&paths).unwrap();
        let text = render(&report, now_millis());
        assert!(text.starts_with("Session 3: Running (group 1/2)\n"));
        assert!(text.contains("Target: a\n"));
        assert!(text.contains("Backoff until: "));
        assert!(text.contains("Stored posts: 1"));
    }
}
