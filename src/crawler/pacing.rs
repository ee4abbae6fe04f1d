//! Randomized pacing between chapter pages
//!
//! Pacing is task-local: every chapter task pauses on its own between the
//! pages it fetches, so concurrent chapters are not serialized behind a
//! global rate limiter. Retries use a separate, longer interval to avoid
//! tripping a site's anti-scraping defenses again.

use crate::config::Interval;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Pauses a chapter task between two page fetches
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, interval: Interval);
}

/// Sleeps for a uniformly random duration within the interval
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPacer;

#[async_trait]
impl Pacer for RandomPacer {
    async fn pause(&self, interval: Interval) {
        let delay = random_delay(interval);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Picks a random delay in `[min_ms, max_ms]`
///
/// A reversed interval is treated as its swapped counterpart.
pub fn random_delay(interval: Interval) -> Duration {
    let (low, high) = if interval.min_ms <= interval.max_ms {
        (interval.min_ms, interval.max_ms)
    } else {
        (interval.max_ms, interval.min_ms)
    };

    if low == high {
        return Duration::from_millis(low);
    }

    Duration::from_millis(rand::rng().random_range(low..=high))
}
