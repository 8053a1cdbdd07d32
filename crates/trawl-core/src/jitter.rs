//! Randomization helpers for human-like pacing.

use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Uniform integer in `[min, max]`. Swapped bounds are tolerated.
pub fn rand_between(min: u64, max: u64) -> u64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rand::thread_rng().gen_range(lo..=hi)
}

/// Signed variant of [`rand_between`], used for scroll distances.
pub fn rand_i64(min: i64, max: i64) -> i64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rand::thread_rng().gen_range(lo..=hi)
}

/// Uniform float in `[min, max)`.
pub fn rand_float(min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..max)
}

/// True with probability `p` (clamped to `[0, 1]`).
pub fn chance(p: f64) -> bool {
    rand::thread_rng().gen_bool(p.clamp(0.0, 1.0))
}

/// Sleep for a uniformly random duration in `[min_ms, max_ms]`.
pub async fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    let d = Duration::from_millis(rand_between(min_ms, max_ms));
    tokio::time::sleep(d).await;
    d
}

/// Fisher-Yates shuffle in place.
pub fn shuffle<T>(items: &mut [T]) {
    items.shuffle(&mut rand::thread_rng());
}
