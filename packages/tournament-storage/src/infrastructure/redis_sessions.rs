//! Redis session cache adapter

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::domain::{BackingStore, SessionStore, StoreKind};
use crate::error::{ErrorKind, Result, StorageError};

pub struct RedisSessions {
    manager: ConnectionManager,
    closed: AtomicBool,
}

impl RedisSessions {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| StorageError::from_driver(ErrorKind::Config, "redis client open", e))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Connection, "redis connect", e))?;
        debug!("Redis connection manager ready");
        Ok(Self {
            manager,
            closed: AtomicBool::new(false),
        })
    }

    /// `ConnectionManager` is a cheap handle; each call works on its own clone.
    fn conn(&self) -> Result<ConnectionManager> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::closed(StoreKind::Session.as_str()));
        }
        Ok(self.manager.clone())
    }
}

#[async_trait]
impl BackingStore for RedisSessions {
    fn kind(&self) -> StoreKind {
        StoreKind::Session
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Connection, "redis ping", e))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisSessions {
    async fn put(&self, key: &str, payload: &Value, ttl: Duration) -> Result<()> {
        let body = serde_json::to_string(payload)?;
        let mut conn = self.conn()?;
        conn.set_ex::<_, _, ()>(key, body, ttl.as_secs())
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Write, key, e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.conn()?;
        let body: Option<String> = conn.get(key).await?;
        body.map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn renew(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn()?;
        let secs = i64::try_from(ttl.as_secs())
            .map_err(|_| StorageError::config(format!("ttl too large: {:?}", ttl)))?;
        let renewed: bool = conn
            .expire(key, secs)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Write, key, e))?;
        Ok(renewed)
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn()?;
        let secs: i64 = conn.ttl(key).await?;
        // -2: missing key, -1: no expiry
        Ok(match secs {
            s if s >= 0 => Some(Duration::from_secs(s as u64)),
            _ => None,
        })
    }
}
