use std::time::Instant;

#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    tokens: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self::new_at(capacity, refill_rate, Instant::now())
    }

    pub fn new_at(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            refill_rate,
            last_refill: now,
        }
    }

    /// Refill for the time elapsed up to `now`, then take `tokens` if available.
    pub fn consume_at(&mut self, tokens: u32, now: Instant) -> bool {
        self.refill_at(now);

        if self.tokens >= tokens as f64 {
            self.tokens -= tokens as f64;
            true
        } else {
            false
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Last time the bucket was touched.
    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    /// Whether the bucket would hold its full capacity at `now`.
    pub fn is_full_at(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens + self.refill_rate * elapsed.as_secs_f64() >= self.capacity as f64
    }

    fn refill_at(&mut self, now: Instant) {
        // Callers may race on `Instant::now()`; never move the clock backwards.
        if now <= self.last_refill {
            return;
        }

        let elapsed = now.duration_since(self.last_refill);
        let tokens_to_add = self.refill_rate * elapsed.as_secs_f64();
        self.tokens = (self.tokens + tokens_to_add).min(self.capacity as f64);
        self.last_refill = now;
    }
}
