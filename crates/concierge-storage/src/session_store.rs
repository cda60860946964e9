// Redis session store with sliding TTL
//
// Keys are namespaced `sessions:<id>`; the value is the JSON-encoded
// session document. Every load, save and touch refreshes the TTL. The hot
// path never raises: transport errors are logged and read as absence.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

use concierge_contracts::SessionDoc;

const KEY_PREFIX: &str = "sessions:";

/// Durable-ish per-session K→V with sliding TTL
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session document, refreshing its TTL
    ///
    /// Absence and transport failure are indistinguishable to the caller;
    /// failures surface only through the log.
    async fn load(&self, id: &str) -> Option<SessionDoc>;

    /// Upsert the document, setting TTL anew (best-effort)
    async fn save(&self, id: &str, doc: &SessionDoc);

    /// Refresh the TTL without mutating the document (best-effort)
    async fn touch(&self, id: &str);
}

fn key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Production store over a shared Redis connection manager
#[derive(Clone)]
pub struct RedisSessionStore {
    manager: ConnectionManager,
    ttl: Duration,
}

impl RedisSessionStore {
    /// Wrap an existing connection manager with the given sliding TTL
    pub fn new(manager: ConnectionManager, ttl: Duration) -> Self {
        Self { manager, ttl }
    }

    /// Connect to Redis and hand out a store with the given sliding TTL
    pub async fn connect(url: &str, ttl: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager, ttl))
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &str) -> Option<SessionDoc> {
        let key = key(id);
        let mut conn = self.manager.clone();

        let raw: Option<String> = match conn.get(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Session load failed, degrading to absence");
                return None;
            }
        };
        let raw = raw?;

        // Sliding window: reading refreshes the TTL
        if let Err(e) = conn.expire::<_, bool>(&key, self.ttl_secs() as i64).await {
            warn!(error = %e, "Session TTL refresh failed");
        }

        match serde_json::from_str(&raw) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(error = %e, "Discarding undecodable session document");
                None
            }
        }
    }

    async fn save(&self, id: &str, doc: &SessionDoc) {
        let encoded = match serde_json::to_string(doc) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "Session encode failed, skipping save");
                return;
            }
        };
        let mut conn = self.manager.clone();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(key(id), encoded, self.ttl_secs())
            .await
        {
            warn!(error = %e, "Session save failed");
        }
    }

    async fn touch(&self, id: &str) {
        let mut conn = self.manager.clone();
        if let Err(e) = conn
            .expire::<_, bool>(key(id), self.ttl_secs() as i64)
            .await
        {
            warn!(error = %e, "Session touch failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(key("S1"), "sessions:S1");
    }
}
