use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::{Faults, MemoryHandle};
use crate::domain::{BackingStore, SessionStore, StoreKind};
use crate::error::Result;

struct Entry {
    payload: Value,
    expires_at: Instant,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// TTL key/value double; expired keys read as absent
pub struct InMemorySessions {
    handle: MemoryHandle<HashMap<String, Entry>>,
}

impl Default for InMemorySessions {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self {
            handle: MemoryHandle::new(StoreKind::Session, HashMap::new()),
        }
    }

    pub fn reopen(&self) -> Self {
        Self {
            handle: self.handle.reopen(),
        }
    }

    pub fn faults(&self) -> &Faults {
        self.handle.faults()
    }
}

#[async_trait]
impl BackingStore for InMemorySessions {
    fn kind(&self) -> StoreKind {
        StoreKind::Session
    }

    async fn ping(&self) -> Result<()> {
        self.handle.ping()
    }

    async fn close(&self) -> Result<()> {
        self.handle.close()
    }
}

#[async_trait]
impl SessionStore for InMemorySessions {
    async fn put(&self, key: &str, payload: &Value, ttl: Duration) -> Result<()> {
        let entry = Entry {
            payload: payload.clone(),
            expires_at: Instant::now() + ttl,
        };
        self.handle.write(|map| {
            map.insert(key.to_string(), entry);
            Ok(())
        })
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = Instant::now();
        self.handle.read(|map| {
            Ok(map
                .get(key)
                .filter(|entry| entry.live(now))
                .map(|entry| entry.payload.clone()))
        })
    }

    async fn renew(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        self.handle.write(|map| match map.get_mut(key) {
            Some(entry) if entry.live(now) => {
                entry.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        })
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        self.handle.read(|map| {
            Ok(map
                .get(key)
                .filter(|entry| entry.live(now))
                .map(|entry| entry.expires_at.saturating_duration_since(now)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{journalist_session_key, SESSION_LEASE};
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_with_lease() {
        let sessions = InMemorySessions::new();
        let key = journalist_session_key("Marta Díaz");
        sessions
            .put(&key, &json!({"outlet": "El Diario"}), SESSION_LEASE)
            .await
            .unwrap();

        let payload = sessions.get(&key).await.unwrap().unwrap();
        assert_eq!(payload["outlet"], "El Diario");

        let ttl = sessions.remaining_ttl(&key).await.unwrap().unwrap();
        assert!(ttl <= SESSION_LEASE);
        assert!(ttl > SESSION_LEASE - Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_expired_session_reads_absent_and_cannot_renew() {
        let sessions = InMemorySessions::new();
        sessions
            .put("session:journalist:x", &json!({}), Duration::ZERO)
            .await
            .unwrap();

        assert!(sessions.get("session:journalist:x").await.unwrap().is_none());
        assert!(!sessions
            .renew("session:journalist:x", SESSION_LEASE)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_renew_extends_live_session() {
        let sessions = InMemorySessions::new();
        sessions
            .put("k", &json!(1), Duration::from_secs(10))
            .await
            .unwrap();

        assert!(sessions.renew("k", SESSION_LEASE).await.unwrap());
        let ttl = sessions.remaining_ttl("k").await.unwrap().unwrap();
        assert!(ttl > Duration::from_secs(10));
    }
}
