//! Cancellable waits used between targets.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_secs(1);

/// Sleep for `duration`, or less if cancelled. Returns false when cancelled.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => !cancel.is_cancelled(),
        _ = cancel.cancelled() => false,
    }
}

/// Count `duration` down one second at a time, calling `on_tick` with the
/// remaining whole seconds before each tick. Cancellation is checked every
/// second. Returns false when cancelled.
pub async fn countdown<F>(duration: Duration, cancel: &CancellationToken, mut on_tick: F) -> bool
where
    F: FnMut(u64),
{
    let mut remaining = duration;
    while !remaining.is_zero() {
        if cancel.is_cancelled() {
            return false;
        }
        on_tick(remaining.as_secs_f64().ceil() as u64);
        let step = remaining.min(TICK);
        if !sleep_or_cancel(step, cancel).await {
            return false;
        }
        remaining -= step;
    }
    !cancel.is_cancelled()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_every_second() {
        let cancel = CancellationToken::new();
        let mut ticks = Vec::new();
        let start = tokio::time::Instant::now();
        assert!(countdown(Duration::from_millis(3_500), &cancel, |s| ticks.push(s)).await);
        assert_eq!(ticks, vec![4, 3, 2, 1]);
        assert_eq!(start.elapsed(), Duration::from_millis(3_500));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_stops_within_a_tick_of_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2_500)).await;
            trigger.cancel();
        });
        let start = tokio::time::Instant::now();
        assert!(!countdown(Duration::from_secs(60), &cancel, |_| {}).await);
        assert!(start.elapsed() <= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_returns_immediately() {
        let cancel = CancellationToken::new();
        let mut ticks = 0;
        assert!(countdown(Duration::ZERO, &cancel, |_| ticks += 1).await);
        assert_eq!(ticks, 0);
    }

    #[tokio::test]
    async fn sleep_or_cancel_reports_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!sleep_or_cancel(Duration::from_secs(30), &cancel).await);
    }
}
