//! Token bucket rate limiting for the gateway's call surfaces.
//!
//! One limiter owns every bucket; buckets are keyed by [`RateLimitKey`] and
//! lazily created from the configuration for that key class. Acquisition
//! takes the bucket map's write lock for the duration of the refill+deduct,
//! so concurrent callers on the same key cannot double-spend tokens.
//! State is in-memory only; a restart refills every bucket.

use sqlgate_commons::config::RateLimitSettings;
use sqlgate_commons::TableName;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Identifies one independently limited resource. Tokens are never borrowed
/// across keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    /// Shared by every operation the gateway serves.
    Global,
    /// LLM-facing calls (SQL drafting).
    Generate,
    /// Database-facing calls on the raw-SQL path.
    Execute,
    /// Per-table execution budget.
    Table(TableName),
}

impl RateLimitKey {
    pub fn class(&self) -> &'static str {
        match self {
            RateLimitKey::Global => "global",
            RateLimitKey::Generate => "llm",
            RateLimitKey::Execute => "db",
            RateLimitKey::Table(_) => "table",
        }
    }
}

/// Outcome of an acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Acquisition {
    Allowed,
    /// Estimated wait until enough tokens will have refilled.
    Denied { retry_after: Duration },
}

impl Acquisition {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Acquisition::Allowed)
    }
}

/// Token bucket with continuous refill and fractional costs.
#[derive(Debug, Clone)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Deduct `cost` tokens, or report how long until they exist.
    fn try_consume(&mut self, cost: f64) -> Result<(), Duration> {
        self.refill();
        if self.tokens >= cost {
            self.tokens -= cost;
            Ok(())
        } else {
            let wait = (cost - self.tokens) / self.refill_per_sec;
            Err(Duration::from_secs_f64(wait.max(0.001)))
        }
    }
}

/// Rate limiter owning one bucket per touched key.
pub struct RateLimiter {
    config: RateLimitSettings,
    buckets: RwLock<HashMap<RateLimitKey, TokenBucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitSettings) -> Self {
        Self {
            config,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    fn bucket_config(&self, key: &RateLimitKey) -> (f64, f64) {
        match key {
            RateLimitKey::Global => (
                self.config.global_capacity as f64,
                self.config.global_refill_per_sec,
            ),
            RateLimitKey::Generate => (
                self.config.generate_capacity as f64,
                self.config.generate_refill_per_sec,
            ),
            RateLimitKey::Execute => (
                self.config.execute_capacity as f64,
                self.config.execute_refill_per_sec,
            ),
            RateLimitKey::Table(_) => (
                self.config.table_capacity as f64,
                self.config.table_refill_per_sec,
            ),
        }
    }

    /// Try to consume `cost` tokens from the bucket for `key`, creating the
    /// bucket on first touch. Mutates only the targeted bucket.
    pub fn acquire(&self, key: &RateLimitKey, cost: f64) -> Acquisition {
        let mut buckets = self.buckets.write().unwrap();
        let (capacity, refill) = self.bucket_config(key);
        let bucket = buckets
            .entry(key.clone())
            .or_insert_with(|| TokenBucket::new(capacity, refill));

        match bucket.try_consume(cost) {
            Ok(()) => Acquisition::Allowed,
            Err(retry_after) => Acquisition::Denied { retry_after },
        }
    }

    /// Current token count for a key, mainly for monitoring and tests.
    pub fn available(&self, key: &RateLimitKey) -> f64 {
        let mut buckets = self.buckets.write().unwrap();
        let (capacity, refill) = self.bucket_config(key);
        let bucket = buckets
            .entry(key.clone())
            .or_insert_with(|| TokenBucket::new(capacity, refill));
        bucket.refill();
        bucket.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slow_settings(capacity: u32) -> RateLimitSettings {
        // Refill slow enough that no token comes back within a test run.
        RateLimitSettings {
            global_capacity: capacity,
            global_refill_per_sec: 0.0001,
            generate_capacity: capacity,
            generate_refill_per_sec: 0.0001,
            execute_capacity: capacity,
            execute_refill_per_sec: 0.0001,
            table_capacity: capacity,
            table_refill_per_sec: 0.0001,
        }
    }

    #[test]
    fn test_conservation_exactly_capacity_acquisitions_succeed() {
        let limiter = RateLimiter::new(slow_settings(5));
        let mut allowed = 0;
        let mut denied = 0;
        for _ in 0..8 {
            match limiter.acquire(&RateLimitKey::Global, 1.0) {
                Acquisition::Allowed => allowed += 1,
                Acquisition::Denied { retry_after } => {
                    assert!(retry_after > Duration::ZERO);
                    denied += 1;
                }
            }
        }
        assert_eq!(allowed, 5);
        assert_eq!(denied, 3);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(slow_settings(1));
        assert!(limiter.acquire(&RateLimitKey::Global, 1.0).is_allowed());
        assert!(!limiter.acquire(&RateLimitKey::Global, 1.0).is_allowed());
        // Other keys still have their full budget.
        assert!(limiter.acquire(&RateLimitKey::Generate, 1.0).is_allowed());
        let sales = RateLimitKey::Table(TableName::new("sales").unwrap());
        let inventory = RateLimitKey::Table(TableName::new("inventory").unwrap());
        assert!(limiter.acquire(&sales, 1.0).is_allowed());
        assert!(limiter.acquire(&inventory, 1.0).is_allowed());
        assert!(!limiter.acquire(&sales, 1.0).is_allowed());
    }

    #[test]
    fn test_fractional_costs() {
        let limiter = RateLimiter::new(slow_settings(2));
        assert!(limiter.acquire(&RateLimitKey::Execute, 1.5).is_allowed());
        assert!(!limiter.acquire(&RateLimitKey::Execute, 1.0).is_allowed());
        assert!(limiter.acquire(&RateLimitKey::Execute, 0.5).is_allowed());
    }

    #[test]
    fn test_tokens_refill_over_time() {
        let mut settings = slow_settings(2);
        settings.global_refill_per_sec = 100.0;
        let limiter = RateLimiter::new(settings);
        assert!(limiter.acquire(&RateLimitKey::Global, 2.0).is_allowed());
        assert!(!limiter.acquire(&RateLimitKey::Global, 1.0).is_allowed());
        std::thread::sleep(Duration::from_millis(50));
        assert!(limiter.acquire(&RateLimitKey::Global, 1.0).is_allowed());
    }

    #[test]
    fn test_refill_never_exceeds_capacity() {
        let mut settings = slow_settings(3);
        settings.global_refill_per_sec = 1000.0;
        let limiter = RateLimiter::new(settings);
        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.available(&RateLimitKey::Global) <= 3.0);
    }

    #[test]
    fn test_no_double_spend_under_contention() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(slow_settings(20)));
        let allowed = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            let allowed = allowed.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..10 {
                    if limiter.acquire(&RateLimitKey::Global, 1.0).is_allowed() {
                        allowed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        // 40 attempts against a 20-token bucket with negligible refill.
        assert_eq!(allowed.load(Ordering::SeqCst), 20);
    }
}
