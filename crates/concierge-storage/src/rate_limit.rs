// Per-session rate limiting over a fixed 60-second window
//
// The bucket lives next to the session data in Redis (`ratelimit:<id>`).
// Window boundaries are not synchronised across sessions. When the backing
// store is unreachable the limiter admits the request and logs a warning:
// an outage must not lock out traffic.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

/// Fixed admission window
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

const KEY_PREFIX: &str = "ratelimit:";

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Denied until the current window ends
    Denied { retry_after_secs: u64 },
}

impl Admission {
    pub fn is_allowed(self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Sliding/fixed-window counter per session id
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn admit(&self, id: &str) -> Admission;
}

fn key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

fn clamp_retry_after(secs: i64) -> u64 {
    secs.clamp(1, RATE_WINDOW.as_secs() as i64) as u64
}

/// Production limiter: INCR + EXPIRE-on-first-hit per window
#[derive(Clone)]
pub struct RedisRateLimiter {
    manager: ConnectionManager,
    limit: u32,
}

impl RedisRateLimiter {
    pub fn new(manager: ConnectionManager, limit: u32) -> Self {
        Self { manager, limit }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn admit(&self, id: &str) -> Admission {
        let key = key(id);
        let mut conn = self.manager.clone();

        let count: u64 = match conn.incr(&key, 1u64).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Rate limiter unreachable, failing open");
                return Admission::Allowed;
            }
        };

        if count == 1 {
            // First hit of the window starts its expiry clock
            if let Err(e) = conn
                .expire::<_, bool>(&key, RATE_WINDOW.as_secs() as i64)
                .await
            {
                warn!(error = %e, "Rate window expiry set failed");
            }
        }

        if count <= u64::from(self.limit) {
            return Admission::Allowed;
        }

        let remaining: i64 = conn.ttl(&key).await.unwrap_or(-1);
        Admission::Denied {
            retry_after_secs: clamp_retry_after(remaining),
        }
    }
}
