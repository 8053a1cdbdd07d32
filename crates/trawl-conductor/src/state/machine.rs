use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use trawl_page::PageId;

// ── Phases ──

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Selecting,
    Running,
    Opening,
    AwaitingReady,
    Extracting,
    Recording,
    Closing,
    Finalizing,
    Stopped,
}

// ── Valid transitions ──

const VALID_TRANSITIONS: &[(SessionPhase, &[SessionPhase])] = &[
    (SessionPhase::Idle, &[SessionPhase::Selecting]),
    (
        SessionPhase::Selecting,
        &[SessionPhase::Running, SessionPhase::Idle],
    ),
    (
        SessionPhase::Running,
        &[
            SessionPhase::Opening,
            SessionPhase::Finalizing,
            SessionPhase::Stopped,
        ],
    ),
    (
        SessionPhase::Opening,
        &[
            SessionPhase::AwaitingReady,
            SessionPhase::Closing,
            SessionPhase::Finalizing,
            SessionPhase::Stopped,
        ],
    ),
    (
        SessionPhase::AwaitingReady,
        &[
            SessionPhase::Extracting,
            SessionPhase::Closing,
            SessionPhase::Finalizing,
            SessionPhase::Stopped,
        ],
    ),
    (
        SessionPhase::Extracting,
        &[
            SessionPhase::Recording,
            SessionPhase::Closing,
            SessionPhase::Finalizing,
            SessionPhase::Stopped,
        ],
    ),
    (
        SessionPhase::Recording,
        &[
            SessionPhase::Closing,
            SessionPhase::Finalizing,
            SessionPhase::Stopped,
        ],
    ),
    (
        SessionPhase::Closing,
        &[
            SessionPhase::Running,
            SessionPhase::Finalizing,
            SessionPhase::Stopped,
        ],
    ),
    (SessionPhase::Finalizing, &[SessionPhase::Idle]),
    (SessionPhase::Stopped, &[SessionPhase::Finalizing]),
];

fn is_valid_transition(from: SessionPhase, to: SessionPhase) -> bool {
    VALID_TRANSITIONS
        .iter()
        .any(|(f, targets)| *f == from && targets.contains(&to))
}

// ── State ──

/// The one live session. Owned by the conductor; everyone else sees clones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionState {
    pub active: bool,
    pub phase: SessionPhase,
    /// Monotonic id of the session this state belongs to; 0 when idle.
    pub session_id: u64,
    pub target_index: usize,
    pub targets: Vec<String>,
    pub target_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_page: Option<PageId>,
    pub current_target_url: String,
    pub status_message: String,
}

/// Move `state` to `to`. Invalid moves are programming errors.
pub fn transition(state: &mut SessionState, to: SessionPhase) -> Result<()> {
    let from = state.phase;
    if !is_valid_transition(from, to) {
        bail!("invalid session transition: {from:?} → {to:?}");
    }
    state.phase = to;
    Ok(())
}

impl SessionState {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Build the state for a freshly claimed session.
    pub fn begin(session_id: u64, targets: Vec<String>) -> Result<Self> {
        let mut state = Self::idle();
        transition(&mut state, SessionPhase::Selecting)?;
        transition(&mut state, SessionPhase::Running)?;
        state.active = true;
        state.session_id = session_id;
        state.target_count = targets.len();
        state.targets = targets;
        state.status_message = "Starting session...".into();
        Ok(state)
    }

    pub fn belongs_to(&self, session_id: u64) -> bool {
        self.active && self.session_id == session_id
    }

    /// Route through finalization back to idle, keeping the last status
    /// message so observers can still see how the session ended.
    pub fn wind_down(&mut self) -> Result<()> {
        if self.phase != SessionPhase::Finalizing {
            if self.phase != SessionPhase::Stopped {
                transition(self, SessionPhase::Stopped)?;
            }
            transition(self, SessionPhase::Finalizing)?;
        }
        transition(self, SessionPhase::Idle)?;
        let message = std::mem::take(&mut self.status_message);
        *self = Self {
            status_message: message,
            ..Self::idle()
        };
        Ok(())
    }

    /// Human-readable progress, e.g. `2/4`.
    pub fn progress(&self) -> String {
        if self.target_count == 0 {
            return "-".into();
        }
        format!("{}/{}", self.target_index + 1, self.target_count)
    }
}
