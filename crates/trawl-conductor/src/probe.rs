//! Readiness probe: poll the page agent until it answers.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use trawl_page::{AgentLink, AgentStatus};

/// Poll `agent` up to `attempts` times, one attempt per `interval` slot.
/// A ping that times out uses up its slot. Transport errors count as
/// "not yet". Returns false on exhaustion or cancellation.
pub async fn probe(
    agent: &AgentLink,
    attempts: u32,
    interval: Duration,
    cancel: &CancellationToken,
) -> bool {
    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return false;
        }
        let slot_end = tokio::time::Instant::now() + interval;
        let ping = tokio::time::timeout(interval, agent.ping()).await;
        match ping {
            Ok(Ok(AgentStatus::Ready)) => {
                tracing::debug!(attempt, "page agent ready");
                return true;
            }
            Ok(Ok(status)) => tracing::debug!(attempt, ?status, "page agent not ready"),
            Ok(Err(e)) => tracing::debug!(attempt, error = %e, "probe failed"),
            Err(_) => tracing::debug!(attempt, "probe timed out"),
        }
        if attempt < attempts {
            tokio::select! {
                _ = tokio::time::sleep_until(slot_end) => {}
                _ = cancel.cancelled() => return false,
            }
        }
    }
    false
}
