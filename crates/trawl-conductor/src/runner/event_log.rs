//! Structured event logging for sessions.
//!
//! Writes append-only JSONL to `<root>/local/events.jsonl`.

use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use trawl_core::format_millis;

// ── Event types ──

/// A session event. Serialized as tagged JSON (`"type": "session_start"`, etc.).
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStart {
        session_id: u64,
        targets: Vec<String>,
    },
    TargetStart {
        index: usize,
        url: String,
    },
    TargetDone {
        url: String,
        posts: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        added: Option<usize>,
        duration_ms: u64,
    },
    TargetFailed {
        url: String,
        reason: String,
        duration_ms: u64,
    },
    Detection {
        url: String,
        kind: String,
        backoff_until: Option<String>,
    },
    SessionEnd {
        session_id: u64,
        completed: usize,
        failed: usize,
        detected: bool,
        stopped: bool,
    },
}

/// Wrapper that adds sequence number and timestamp to each event.
#[derive(Debug, Serialize)]
pub struct FullEvent {
    pub seq: u32,
    pub ts: String,
    #[serde(flatten)]
    pub event: Event,
}

// ── EventLogger ──

/// Append-only JSONL event writer.
pub struct EventLogger {
    jsonl_path: Option<PathBuf>,
    seq: u32,
}

impl EventLogger {
    pub fn new(jsonl_path: impl Into<PathBuf>) -> Self {
        Self {
            jsonl_path: Some(jsonl_path.into()),
            seq: 0,
        }
    }

    /// Logger that only counts; nothing hits disk.
    pub fn disabled() -> Self {
        Self {
            jsonl_path: None,
            seq: 0,
        }
    }

    /// Record an event. Best-effort: write failures are logged and dropped.
    pub fn record(&mut self, event: Event) {
        let full = FullEvent {
            seq: self.seq,
            ts: format_millis(trawl_core::now_millis()),
            event,
        };
        self.seq += 1;

        let Some(path) = &self.jsonl_path else {
            return;
        };
        if let Ok(line) = serde_json::to_string(&full) {
            if let Err(e) = append_line(path, &line) {
                tracing::debug!(path = %path.display(), error = %e, "event log write failed");
            }
        }
    }
}

/// Append a single line to a file, creating parent dirs if needed.
fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_session_start_serialization() {
        let event = Event::SessionStart {
            session_id: 3,
            targets: vec!["https://fb.test/groups/a".into()],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"session_start""#));
        assert!(json.contains(r#""session_id":3"#));
    }

    #[test]
    fn target_done_omits_unknown_added() {
        let event = Event::TargetDone {
            url: "u".into(),
            posts: 4,
            added: None,
            duration_ms: 10,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"target_done""#));
        assert!(!json.contains("added"));
    }

    #[test]
    fn full_event_includes_seq_and_ts() {
        let full = FullEvent {
            seq: 5,
            ts: "2026-02-18T10:00:00Z".into(),
            event: Event::TargetStart {
                index: 1,
                url: "u".into(),
            },
        };
        let json = serde_json::to_string(&full).unwrap();
        assert!(json.contains(r#""seq":5"#));
        assert!(json.contains(r#""ts":"2026-02-18T10:00:00Z""#));
        assert!(json.contains(r#""type":"target_start""#));
    }

    #[test]
    fn event_logger_creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local").join("events.jsonl");
        let mut logger = EventLogger::new(&path);

        logger.record(Event::SessionStart {
            session_id: 1,
            targets: vec![],
        });
        logger.record(Event::TargetFailed {
            url: "u".into(),
            reason: "TIMEOUT".into(),
            duration_ms: 180_000,
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first["seq"], 0);
        assert_eq!(second["seq"], 1);
        assert_eq!(second["type"], "target_failed");
        assert_eq!(second["reason"], "TIMEOUT");
    }

    #[test]
    fn disabled_logger_writes_nothing() {
        let mut logger = EventLogger::disabled();
        logger.record(Event::TargetStart {
            index: 0,
            url: "u".into(),
        });
        assert_eq!(logger.seq, 1);
    }
}
