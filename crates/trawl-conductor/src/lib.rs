pub mod gate;
pub mod probe;
pub mod runner;
pub mod state;

pub use gate::{QuotaGate, Verdict};
pub use runner::notify::{CollectNotifier, Notifier, StdoutNotifier};
pub use runner::session::{Conductor, SessionDeps, SessionHandle, SessionSummary, TargetOutcome};
pub use state::machine::{SessionPhase, SessionState};
