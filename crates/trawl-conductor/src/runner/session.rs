//! The session conductor: start / stop / status over one paced multi-group
//! run.
//!
//! A session walks its targets strictly one at a time. Per target it opens a
//! page, waits for it to settle, probes the page agent, commands extraction
//! and awaits the single result under a deadline. Detection aborts the whole
//! session and engages global backoff; every other per-target failure is
//! isolated. Finalization always runs, including after a panic in the
//! session task.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use trawl_core::config::Settings;
use trawl_core::jitter::shuffle;
use trawl_core::repo::{PostRepository, QuotaRepository, SettingsSource};
use trawl_core::{format_millis, Detection, ExtractionResult, StartError};
use trawl_page::{Browser, ExtractionTicket, PageHandle};

use crate::gate::QuotaGate;
use crate::probe::probe;
use crate::runner::event_log::{Event, EventLogger};
use crate::runner::notify::Notifier;
use crate::runner::status_file::spawn_status_writer;
use crate::runner::wait::{countdown, sleep_or_cancel};
use crate::state::machine::{transition, SessionPhase, SessionState};

/// How a single target ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetOutcome {
    /// Extraction finished; `added` is `None` when the store write failed.
    Completed { posts: usize, added: Option<usize> },
    /// The page agent never answered the readiness probe.
    Unreachable,
    Failed { reason: String },
    Detected(Detection),
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: u64,
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
    pub posts_found: usize,
    pub detected: bool,
    pub stopped: bool,
    pub crashed: bool,
}

/// Collaborators a conductor drives.
pub struct SessionDeps {
    pub settings: Arc<dyn SettingsSource>,
    pub quota: Arc<dyn QuotaRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub browser: Arc<dyn Browser>,
    pub notifier: Arc<dyn Notifier>,
    pub event_log: Option<PathBuf>,
    /// Marker file whose appearance requests a stop.
    pub stop_marker: Option<PathBuf>,
}

impl SessionDeps {
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        quota: Arc<dyn QuotaRepository>,
        posts: Arc<dyn PostRepository>,
        browser: Arc<dyn Browser>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            quota,
            posts,
            browser,
            notifier,
            event_log: None,
            stop_marker: None,
        }
    }

    pub fn with_event_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.event_log = Some(path.into());
        self
    }

    pub fn with_stop_marker(mut self, path: impl Into<PathBuf>) -> Self {
        self.stop_marker = Some(path.into());
        self
    }
}

/// A started session. Await [`SessionHandle::wait`] for its summary.
pub struct SessionHandle {
    pub session_id: u64,
    pub targets: Vec<String>,
    task: JoinHandle<SessionSummary>,
}

impl SessionHandle {
    pub async fn wait(self) -> SessionSummary {
        let session_id = self.session_id;
        self.task.await.unwrap_or_else(|e| {
            tracing::error!(session_id, error = %e, "session supervisor failed");
            SessionSummary {
                session_id,
                crashed: true,
                ..Default::default()
            }
        })
    }
}

/// Owner of the single live [`SessionState`].
#[derive(Clone)]
pub struct Conductor {
    inner: Arc<Inner>,
}

struct Inner {
    deps: SessionDeps,
    state: watch::Sender<SessionState>,
    cancel: Mutex<CancellationToken>,
    next_session: AtomicU64,
    events: Mutex<EventLogger>,
}

impl Conductor {
    pub fn new(deps: SessionDeps) -> Self {
        let events = match &deps.event_log {
            Some(path) => EventLogger::new(path),
            None => EventLogger::disabled(),
        };
        let (state, _) = watch::channel(SessionState::idle());
        Self {
            inner: Arc::new(Inner {
                deps,
                state,
                cancel: Mutex::new(CancellationToken::new()),
                next_session: AtomicU64::new(0),
                events: Mutex::new(events),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn status(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Observe every state broadcast.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Mirror every broadcast to a JSON file.
    pub fn mirror_status(&self, path: impl Into<PathBuf>) -> JoinHandle<()> {
        spawn_status_writer(self.subscribe(), path.into())
    }

    /// Start-session. Rejections leave the current state untouched.
    pub async fn start(&self) -> Result<SessionHandle, StartError> {
        let inner = &self.inner;
        if inner.state.borrow().active {
            return Err(StartError::AlreadyRunning);
        }

        let settings = inner.deps.settings.settings()?;
        let candidates = configured_targets(&settings);
        if candidates.is_empty() {
            return Err(StartError::NoTargets);
        }

        let gate = QuotaGate::new(inner.deps.quota.clone(), settings.limits.clone());
        let mut chosen = gate
            .evaluate(&candidates)?
            .into_result()
            .map_err(|denial| {
                tracing::info!(reason = %denial.describe(), "start denied by quota gate");
                StartError::Denied(denial)
            })?;
        shuffle(&mut chosen);
        chosen.truncate(settings.limits.max_session_targets.max(1));

        let session_id = inner.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let fresh = SessionState::begin(session_id, chosen.clone())?;
        let claimed = inner.state.send_if_modified(|s| {
            if s.active {
                return false;
            }
            *s = fresh;
            true
        });
        if !claimed {
            return Err(StartError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        if let Ok(mut slot) = inner.cancel.lock() {
            *slot = cancel.clone();
        }
        if let Some(marker) = &inner.deps.stop_marker {
            let _ = std::fs::remove_file(marker);
        }

        tracing::info!(session_id, targets = chosen.len(), "session started");
        inner.record(Event::SessionStart {
            session_id,
            targets: chosen.clone(),
        });
        inner
            .notify(
                "Scraper Started",
                &format!("Processing {} groups", chosen.len()),
            )
            .await;

        let task = tokio::spawn(inner.clone().supervise(session_id, settings, cancel));
        Ok(SessionHandle {
            session_id,
            targets: chosen,
            task,
        })
    }

    /// Stop-session. Returns false when nothing was running.
    pub async fn stop(&self) -> bool {
        self.inner.stop_session().await
    }
}

/// Configured group links, trimmed, blanks dropped.
fn configured_targets(settings: &Settings) -> Vec<String> {
    settings
        .group_links
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

impl Inner {
    // ── State helpers ──

    /// Mutate the state if it still belongs to `session_id`.
    fn update(&self, session_id: u64, f: impl FnOnce(&mut SessionState)) -> bool {
        self.state.send_if_modified(|s| {
            if !s.belongs_to(session_id) {
                return false;
            }
            f(s);
            true
        })
    }

    fn enter(&self, session_id: u64, phase: SessionPhase) -> Result<()> {
        let mut failed = None;
        self.state.send_if_modified(|s| {
            if !s.belongs_to(session_id) {
                return false;
            }
            match transition(s, phase) {
                Ok(()) => true,
                Err(e) => {
                    failed = Some(e);
                    false
                }
            }
        });
        match failed {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn set_message(&self, session_id: u64, message: impl Into<String>) {
        let message = message.into();
        self.update(session_id, |s| s.status_message = message);
    }

    async fn notify(&self, title: &str, message: &str) {
        tracing::info!(title, message, "notification");
        self.deps.notifier.notify(title, message).await;
    }

    fn record(&self, event: Event) {
        if let Ok(mut log) = self.events.lock() {
            log.record(event);
        }
    }

    /// Close any open page and reset to idle. With `session_id`, only
    /// touches that session's state. Returns whether anything was reset.
    async fn wind_down(&self, session_id: Option<u64>, message: &str) -> bool {
        let mut page = None;
        let changed = self.state.send_if_modified(|s| {
            if !s.active || session_id.is_some_and(|id| id != s.session_id) {
                return false;
            }
            page = s.active_page.take();
            s.status_message = message.to_string();
            if let Err(e) = s.wind_down() {
                tracing::error!(error = %e, "forcing idle state");
                *s = SessionState {
                    status_message: message.to_string(),
                    ..SessionState::idle()
                };
            }
            true
        });
        if let Some(page) = page {
            self.deps.browser.close_page(page).await;
        }
        changed
    }

    async fn stop_session(&self) -> bool {
        let token = self.cancel.lock().map(|t| t.clone()).ok();
        if let Some(token) = token {
            token.cancel();
        }
        let stopped = self.wind_down(None, "Stopped").await;
        if stopped {
            tracing::info!("session stopped");
            self.notify(
                "Scraper Stopped",
                "The scraping session has explicitly stopped.",
            )
            .await;
        }
        stopped
    }

    // ── Session lifecycle ──

    async fn supervise(
        self: Arc<Self>,
        session_id: u64,
        settings: Settings,
        cancel: CancellationToken,
    ) -> SessionSummary {
        let watcher_done = CancellationToken::new();
        let watcher = self
            .deps
            .stop_marker
            .clone()
            .map(|path| spawn_stop_watcher(self.clone(), path, watcher_done.clone()));

        let worker = tokio::spawn(self.clone().run_targets(session_id, settings, cancel.clone()));
        let mut summary = match worker.await {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                let msg = format!("{e:#}");
                tracing::error!(session_id, error = %msg, "session failed");
                self.notify("System Error", &msg).await;
                crashed(session_id)
            }
            Err(e) => {
                let msg = if e.is_panic() {
                    "session task panicked".to_string()
                } else {
                    format!("session task ended: {e}")
                };
                tracing::error!(session_id, error = %msg, "session failed");
                self.notify("System Error", &msg).await;
                crashed(session_id)
            }
        };

        watcher_done.cancel();
        if let Some(watcher) = watcher {
            let _ = watcher.await;
        }
        summary.stopped |= cancel.is_cancelled();
        self.finalize(&summary).await;
        summary
    }

    async fn finalize(&self, summary: &SessionSummary) {
        let id = summary.session_id;
        if let Err(e) = self.enter(id, SessionPhase::Finalizing) {
            tracing::error!(session_id = id, error = %e, "finalize transition");
        }
        let message = if summary.detected {
            "Session ended: security check"
        } else if summary.stopped {
            "Session stopped"
        } else {
            "Session complete. Data saved."
        };
        self.set_message(id, message);

        self.record(Event::SessionEnd {
            session_id: id,
            completed: summary.completed,
            failed: summary.failed,
            detected: summary.detected,
            stopped: summary.stopped,
        });
        tracing::info!(
            session_id = id,
            completed = summary.completed,
            failed = summary.failed,
            posts = summary.posts_found,
            "session finished"
        );
        self.notify(
            "Session Complete",
            &format!(
                "{} of {} groups processed, {} posts found",
                summary.completed, summary.attempted, summary.posts_found
            ),
        )
        .await;

        self.wind_down(Some(id), message).await;
    }

    async fn run_targets(
        self: Arc<Self>,
        session_id: u64,
        settings: Settings,
        cancel: CancellationToken,
    ) -> Result<SessionSummary> {
        let targets = self.state.borrow().targets.clone();
        let total = targets.len();
        let gate = QuotaGate::new(self.deps.quota.clone(), settings.limits.clone());
        let mut summary = SessionSummary {
            session_id,
            ..Default::default()
        };

        for (index, url) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            self.update(session_id, |s| {
                s.target_index = index;
                s.current_target_url = url.clone();
                s.status_message = format!("Scraping group {}/{total}...", index + 1);
            });
            self.record(Event::TargetStart {
                index,
                url: url.clone(),
            });
            tracing::info!(target = %url, position = index + 1, total, "target start");

            summary.attempted += 1;
            let started = Instant::now();
            let outcome = self
                .run_target(session_id, url, &settings, &gate, &cancel)
                .await?;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                TargetOutcome::Completed { posts, added } => {
                    summary.completed += 1;
                    summary.posts_found += posts;
                    self.record(Event::TargetDone {
                        url: url.clone(),
                        posts,
                        added,
                        duration_ms,
                    });
                    self.notify(
                        "Group Finished",
                        &format!("Group {}/{total}: {posts} posts found", index + 1),
                    )
                    .await;
                }
                TargetOutcome::Unreachable => {
                    summary.failed += 1;
                    self.record(Event::TargetFailed {
                        url: url.clone(),
                        reason: "unreachable".into(),
                        duration_ms,
                    });
                    self.notify(
                        "Connection Error",
                        &format!("Could not connect to group {}", index + 1),
                    )
                    .await;
                }
                TargetOutcome::Failed { reason } => {
                    summary.failed += 1;
                    tracing::warn!(target = %url, %reason, "target failed");
                    self.notify(
                        "Group Error",
                        &format!("Group {} failed: {reason}", index + 1),
                    )
                    .await;
                    self.record(Event::TargetFailed {
                        url: url.clone(),
                        reason,
                        duration_ms,
                    });
                }
                TargetOutcome::Detected(detection) => {
                    summary.detected = true;
                    self.on_detection(session_id, url, detection, &gate, &settings)
                        .await;
                    break;
                }
                TargetOutcome::Cancelled => {
                    summary.stopped = true;
                    break;
                }
            }

            if index + 1 < total && !self.pause_between(session_id, index, &settings, &cancel).await
            {
                summary.stopped = true;
                break;
            }
        }
        Ok(summary)
    }

    async fn on_detection(
        &self,
        session_id: u64,
        url: &str,
        detection: Detection,
        gate: &QuotaGate,
        settings: &Settings,
    ) {
        let hours = settings.limits.global_backoff_hours;
        tracing::warn!(target = %url, kind = %detection.kind, "challenge detected, aborting session");
        let backoff_gate = gate.clone();
        let until = match store_io(move || backoff_gate.engage_global_backoff(hours)).await {
            Ok(until) => Some(until),
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "could not persist global backoff");
                self.notify("Storage Error", &format!("Could not save backoff: {e:#}"))
                    .await;
                None
            }
        };
        self.record(Event::Detection {
            url: url.to_string(),
            kind: detection.kind.to_string(),
            backoff_until: until.map(format_millis),
        });
        self.set_message(session_id, "Security check detected. Session aborted.");
        self.notify(
            "Security Check",
            &format!(
                "Detected a {} page. Stopping and backing off for {hours}h.",
                detection.kind
            ),
        )
        .await;
    }

    /// Inter-target delay plus the periodic long break. False when cancelled.
    async fn pause_between(
        &self,
        session_id: u64,
        index: usize,
        settings: &Settings,
        cancel: &CancellationToken,
    ) -> bool {
        let delay = settings.timings.inter_target.sample();
        tracing::debug!(secs = delay.as_secs(), "inter-target delay");
        if !self.countdown(session_id, delay, cancel).await {
            return false;
        }

        let every = settings.limits.long_break_every;
        if every > 0 && (index + 1) % every == 0 {
            let pause = settings.timings.long_break.sample();
            self.notify(
                "Long Break",
                &format!("Taking a {}s break before the next group", pause.as_secs()),
            )
            .await;
            if !self.countdown(session_id, pause, cancel).await {
                return false;
            }
        }
        self.set_message(session_id, "Resuming...");
        true
    }

    async fn countdown(&self, session_id: u64, duration: Duration, cancel: &CancellationToken) -> bool {
        countdown(duration, cancel, |secs| {
            self.set_message(session_id, format!("Waiting {secs}s for next group..."));
        })
        .await
    }

    // ── Per target ──

    async fn run_target(
        &self,
        session_id: u64,
        url: &str,
        settings: &Settings,
        gate: &QuotaGate,
        cancel: &CancellationToken,
    ) -> Result<TargetOutcome> {
        self.enter(session_id, SessionPhase::Opening)?;
        let handle = match self.deps.browser.open_page(url).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(target = %url, error = %format!("{e:#}"), "could not open page");
                self.enter(session_id, SessionPhase::Closing)?;
                self.enter(session_id, SessionPhase::Running)?;
                return Ok(TargetOutcome::Failed {
                    reason: format!("open failed: {e:#}"),
                });
            }
        };
        self.update(session_id, |s| s.active_page = Some(handle.id));

        let outcome = self
            .drive_page(session_id, &handle, settings, gate, cancel)
            .await;

        let closing = self.enter(session_id, SessionPhase::Closing);
        self.deps.browser.close_page(handle.id).await;
        self.update(session_id, |s| s.active_page = None);
        closing?;
        self.enter(session_id, SessionPhase::Running)?;
        outcome
    }

    async fn drive_page(
        &self,
        session_id: u64,
        handle: &PageHandle,
        settings: &Settings,
        gate: &QuotaGate,
        cancel: &CancellationToken,
    ) -> Result<TargetOutcome> {
        let timings = &settings.timings;
        self.set_message(session_id, "Waiting for page to load...");
        if !sleep_or_cancel(timings.settle.sample(), cancel).await {
            return Ok(TargetOutcome::Cancelled);
        }

        self.enter(session_id, SessionPhase::AwaitingReady)?;
        let ready = probe(
            &handle.agent,
            timings.probe_attempts,
            timings.probe_interval(),
            cancel,
        )
        .await;
        if !ready {
            if cancel.is_cancelled() {
                return Ok(TargetOutcome::Cancelled);
            }
            tracing::warn!(target = %handle.url, "page agent never became ready");
            return Ok(TargetOutcome::Unreachable);
        }

        self.enter(session_id, SessionPhase::Extracting)?;
        self.set_message(session_id, "Extracting posts...");
        let ticket = match handle.agent.begin_extraction().await {
            Ok(ticket) => ticket,
            Err(e) => {
                return Ok(TargetOutcome::Failed {
                    reason: format!("{e:#}"),
                })
            }
        };
        let Some(result) = self
            .await_result(session_id, ticket, timings.extraction_timeout(), cancel)
            .await
        else {
            return Ok(TargetOutcome::Cancelled);
        };

        match result {
            ExtractionResult::Detection { detection } => Ok(TargetOutcome::Detected(detection)),
            ExtractionResult::Error { reason } => Ok(TargetOutcome::Failed { reason }),
            ExtractionResult::Posts { posts, diagnostics } => {
                self.enter(session_id, SessionPhase::Recording)?;
                if posts.is_empty() {
                    tracing::warn!(
                        target = %handle.url,
                        candidates = diagnostics.candidates,
                        strategy = diagnostics.strategy.as_deref().unwrap_or("-"),
                        "no posts extracted"
                    );
                }
                let store = self.deps.posts.clone();
                let batch = posts.clone();
                let added = match store_io(move || store.merge(&batch)).await {
                    Ok(added) => Some(added),
                    Err(e) => {
                        tracing::error!(error = %format!("{e:#}"), "could not store posts");
                        self.notify("Storage Error", &format!("Could not save posts: {e:#}"))
                            .await;
                        None
                    }
                };
                let run_gate = gate.clone();
                let url = handle.url.clone();
                if let Err(e) = store_io(move || run_gate.record_run(&[url])).await {
                    tracing::error!(error = %format!("{e:#}"), "could not record run");
                    self.notify("Storage Error", &format!("Could not save quota: {e:#}"))
                        .await;
                }
                Ok(TargetOutcome::Completed {
                    posts: posts.len(),
                    added,
                })
            }
        }
    }

    /// Wait for the single extraction result, forwarding status narration.
    /// `None` means the session was cancelled first.
    async fn await_result(
        &self,
        session_id: u64,
        ticket: ExtractionTicket,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Option<ExtractionResult> {
        let ExtractionTicket {
            mut result,
            mut status,
        } = ticket;
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                r = &mut result => {
                    return Some(r.unwrap_or_else(|_| ExtractionResult::Error {
                        reason: "page agent went away".into(),
                    }));
                }
                Some(message) = status.recv() => self.set_message(session_id, message),
                _ = &mut deadline => {
                    tracing::warn!(secs = timeout.as_secs(), "extraction timed out");
                    return Some(ExtractionResult::timeout());
                }
                _ = cancel.cancelled() => return None,
            }
        }
    }
}

fn crashed(session_id: u64) -> SessionSummary {
    SessionSummary {
        session_id,
        crashed: true,
        ..Default::default()
    }
}

/// Poll `path` once per second; its appearance performs the stop transition.
fn spawn_stop_watcher(inner: Arc<Inner>, path: PathBuf, done: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                _ = done.cancelled() => return,
            }
            if path.exists() {
                let _ = std::fs::remove_file(&path);
                tracing::info!(path = %path.display(), "stop requested by marker file");
                inner.stop_session().await;
                return;
            }
        }
    })
}

/// Run locking file I/O on the blocking pool.
async fn store_io<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("store task failed: {e}"))?
}
