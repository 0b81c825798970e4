//! Issuance rate limiting.
//!
//! Counts code issuances per identity inside a fixed window. The store is
//! a trait so a shared backend can replace the in-memory map without
//! touching the issuer; what the trait must guarantee is that checking
//! the limit and counting the attempt happen as one atomic step per key.

use dashmap::DashMap;
use std::time::Instant;
use time::{Duration, OffsetDateTime};

/// Issuance counter for one identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_start: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited,
}

pub trait RateLimitStore: Send + Sync {
    /// Counts one issuance attempt against `key`, atomically: two
    /// concurrent calls can never both pass the same remaining slot.
    /// A window that has fully elapsed restarts the count at this
    /// attempt; a denied attempt leaves the record untouched.
    fn try_acquire(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: OffsetDateTime,
    ) -> RateLimitDecision;

    /// Current record for `key`, if any.
    fn get(&self, key: &str) -> Option<RateLimitRecord>;

    /// Drops records whose window started before `cutoff`.
    fn sweep(&self, cutoff: OffsetDateTime);
}

/// [`RateLimitStore`] over a concurrent map, with lazy cleanup of stale
/// records on access.
pub struct InMemoryRateLimitStore {
    records: DashMap<String, RateLimitRecord>,
    last_cleanup: std::sync::Mutex<Instant>,
}

impl Default for InMemoryRateLimitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            last_cleanup: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Perform lazy cleanup if enough time has passed
    fn maybe_cleanup(&self, cutoff: OffsetDateTime) {
        const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

        // Check if cleanup is needed (non-blocking)
        if let Ok(mut last_cleanup) = self.last_cleanup.try_lock() {
            if last_cleanup.elapsed() >= CLEANUP_INTERVAL {
                *last_cleanup = Instant::now();
                drop(last_cleanup); // Release lock before cleanup

                self.records
                    .retain(|_, record| record.window_start >= cutoff);
            }
        }
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn try_acquire(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: OffsetDateTime,
    ) -> RateLimitDecision {
        self.maybe_cleanup(now - window);

        // The entry guard holds the shard lock, making the
        // check-then-increment atomic per key.
        let mut record = self
            .records
            .entry(key.to_string())
            .or_insert(RateLimitRecord {
                count: 0,
                window_start: now,
            });

        if now - record.window_start >= window {
            record.count = 0;
            record.window_start = now;
        }

        if record.count >= limit {
            return RateLimitDecision::Limited;
        }

        record.count += 1;
        RateLimitDecision::Allowed {
            remaining: limit - record.count,
        }
    }

    fn get(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.get(key).map(|record| *record)
    }

    fn sweep(&self, cutoff: OffsetDateTime) {
        self.records
            .retain(|_, record| record.window_start >= cutoff);
    }
}
