// In-memory store and limiter for tests and Redis-less development
//
// Both honor the same TTL/window semantics as their Redis counterparts.
// Time is tokio's, so paused-clock tests can drive expiry deterministically.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use concierge_contracts::SessionDoc;

use crate::rate_limit::{Admission, RateLimiter, RATE_WINDOW};
use crate::session_store::SessionStore;

/// In-memory session store with sliding expiry
pub struct MemorySessionStore {
    ttl: Duration,
    inner: RwLock<HashMap<String, (SessionDoc, Instant)>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live (unexpired) sessions, for tests
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner.read().values().filter(|(_, exp)| *exp > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Option<SessionDoc> {
        use std::collections::hash_map::Entry;

        let now = Instant::now();
        match self.inner.write().entry(id.to_string()) {
            Entry::Occupied(entry) if entry.get().1 <= now => {
                entry.remove();
                None
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().1 = now + self.ttl;
                Some(entry.get().0.clone())
            }
            Entry::Vacant(_) => None,
        }
    }

    async fn save(&self, id: &str, doc: &SessionDoc) {
        self.inner
            .write()
            .insert(id.to_string(), (doc.clone(), Instant::now() + self.ttl));
    }

    async fn touch(&self, id: &str) {
        if let Some((_, expires)) = self.inner.write().get_mut(id) {
            *expires = Instant::now() + self.ttl;
        }
    }
}

struct RateBucket {
    window_start: Instant,
    count: u32,
}

/// In-memory fixed-window limiter
pub struct MemoryRateLimiter {
    limit: u32,
    buckets: RwLock<HashMap<String, RateBucket>>,
}

impl MemoryRateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            buckets: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn admit(&self, id: &str) -> Admission {
        let now = Instant::now();
        let mut buckets = self.buckets.write();
        let bucket = buckets.entry(id.to_string()).or_insert(RateBucket {
            window_start: now,
            count: 0,
        });

        if now.duration_since(bucket.window_start) >= RATE_WINDOW {
            bucket.window_start = now;
            bucket.count = 0;
        }

        bucket.count += 1;
        if bucket.count <= self.limit {
            Admission::Allowed
        } else {
            let elapsed = now.duration_since(bucket.window_start);
            let remaining = RATE_WINDOW.saturating_sub(elapsed).as_secs().max(1);
            Admission::Denied {
                retry_after_secs: remaining,
            }
        }
    }
}
