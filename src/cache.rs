// src/cache.rs
//! One TTL-bounded slot memoizing a full pipeline run.
//!
//! A read inside the TTL window returns the cached payload unchanged and
//! skips the entire fan-out. No stampede protection: concurrent readers
//! past expiry may each trigger a fresh run, which is acceptable at this
//! TTL granularity. The clock is injected so TTL tests are deterministic.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::article::AggregationResult;

pub const ENV_CACHE_TTL_SECS: &str = "NEWS_CACHE_TTL_SECS";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 360;

pub fn ttl_secs_from_env() -> u64 {
    std::env::var(ENV_CACHE_TTL_SECS)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_CACHE_TTL_SECS)
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for deterministic TTL tests.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().expect("manual clock lock poisoned");
        *now += chrono::Duration::from_std(by).expect("duration out of range");
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().expect("manual clock lock poisoned")
    }
}

struct Entry {
    key: String,
    payload: AggregationResult,
    stored_at: DateTime<Utc>,
}

/// Single shared slot holding the latest run. Last writer wins; each
/// payload is immutable and fully derived from its own inputs, so no
/// cross-call locking beyond the RwLock is needed.
pub struct ResponseCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<Entry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: RwLock::new(None),
        }
    }

    /// TTL from `NEWS_CACHE_TTL_SECS`, defaulting to six minutes.
    pub fn from_env(clock: Arc<dyn Clock>) -> Self {
        Self::new(Duration::from_secs(ttl_secs_from_env()), clock)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh payload for this key, or None (expired, empty, or a different
    /// parameter set currently occupies the slot).
    pub fn get(&self, key: &str) -> Option<AggregationResult> {
        let slot = self.slot.read().expect("cache lock poisoned");
        let entry = slot.as_ref()?;
        if entry.key != key {
            return None;
        }
        let age = self
            .clock
            .now()
            .signed_duration_since(entry.stored_at)
            .to_std()
            .unwrap_or(Duration::MAX);
        if age >= self.ttl {
            return None;
        }
        Some(entry.payload.clone())
    }

    pub fn set(&self, key: &str, payload: AggregationResult) {
        let mut slot = self.slot.write().expect("cache lock poisoned");
        *slot = Some(Entry {
            key: key.to_string(),
            payload,
            stored_at: self.clock.now(),
        });
    }

    pub fn clear(&self) {
        let mut slot = self.slot.write().expect("cache lock poisoned");
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(n: usize) -> AggregationResult {
        AggregationResult {
            articles: Vec::new(),
            fetched_at: Utc::now(),
            sources_attempted: n,
            sources_succeeded: n,
        }
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResponseCache::new(Duration::from_secs(360), clock.clone());

        cache.set("k", payload(3));
        assert!(cache.get("k").is_some());

        clock.advance(Duration::from_secs(359));
        assert!(cache.get("k").is_some());

        clock.advance(Duration::from_secs(2));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn different_key_is_a_miss() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResponseCache::new(Duration::from_secs(360), clock);
        cache.set("a", payload(1));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn set_replaces_wholesale_and_clear_empties() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResponseCache::new(Duration::from_secs(360), clock);
        cache.set("a", payload(1));
        cache.set("a", payload(2));
        assert_eq!(cache.get("a").unwrap().sources_attempted, 2);
        cache.clear();
        assert!(cache.get("a").is_none());
    }
}
