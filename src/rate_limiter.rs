use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::token_bucket::TokenBucket;

/// Per-client token buckets, created on first sight of a key.
///
/// Each key lives in one dashmap shard; insert-or-update holds that shard's
/// lock, so concurrent requests for the same key never double-spend a token.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<String, TokenBucket>>,
    capacity: u32,
    refill_rate: f64,
}

impl RateLimiter {
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        RateLimiter {
            buckets: Arc::new(DashMap::new()),
            capacity,
            refill_rate,
        }
    }

    /// Take one token for `key`; `false` when the client is throttled.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        if let Some(mut bucket) = self.buckets.get_mut(key) {
            return bucket.consume_at(1, now);
        }

        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new_at(self.capacity, self.refill_rate, now));
        bucket.consume_at(1, now)
    }

    /// Number of clients currently holding a bucket.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    /// Drop buckets untouched for at least `max_idle` that have also refilled
    /// to capacity, so a re-created bucket grants nothing extra. Returns how
    /// many went.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        self.evict_idle_at(max_idle, Instant::now())
    }

    pub fn evict_idle_at(&self, max_idle: Duration, now: Instant) -> usize {
        let initial_count = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            now.saturating_duration_since(bucket.last_refill()) < max_idle
                || !bucket.is_full_at(now)
        });
        initial_count.saturating_sub(self.buckets.len())
    }

    /// Periodically evict idle buckets for the life of the process.
    pub fn spawn_sweeper(&self, every: Duration, max_idle: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = limiter.evict_idle(max_idle);
                if evicted > 0 {
                    tracing::debug!(
                        evicted,
                        remaining = limiter.tracked_keys(),
                        "evicted idle rate limit buckets"
                    );
                }
            }
        })
    }
}
