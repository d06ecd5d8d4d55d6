// ============================================================================
// Convo Infrastructure - Redis Session Store
// File: crates/convo-infrastructure/src/cache/redis_store.rs
// ============================================================================
//! Session store over Redis or Valkey with sliding expiration

use async_trait::async_trait;
use deadpool_redis::redis::{self, RedisError};
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use convo_core::domain::{storage_key, Session};
use convo_core::error::SessionError;
use convo_core::repositories::SessionStore;
use convo_shared::config::RedisSettings;

pub struct RedisSessionStore {
    pool: Pool,
    ttl: Duration,
    command_timeout: Duration,
}

impl RedisSessionStore {
    /// Build the connection pool. No connection is opened until first use;
    /// call [`SessionStore::ping`] to check reachability.
    pub fn new(settings: &RedisSettings, ttl: Duration) -> Result<Self, SessionError> {
        let mut cfg = Config::from_url(settings.url.clone());
        cfg.pool = Some(PoolConfig::new(settings.max_connections));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| SessionError::Persistence(format!("invalid redis configuration: {}", e)))?;

        Ok(Self {
            pool,
            ttl,
            command_timeout: settings.command_timeout(),
        })
    }

    /// `EX` takes whole seconds: round up, never below 1.
    fn ttl_seconds(&self) -> u64 {
        (self.ttl.as_secs_f64().ceil() as u64).max(1)
    }

    async fn connection(&self) -> Result<Connection, SessionError> {
        self.pool.get().await.map_err(|e| {
            error!("Failed to acquire redis connection: {}", e);
            SessionError::Persistence(format!("unable to acquire connection: {}", e))
        })
    }

    /// Run one backend operation under the command timeout.
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, SessionError>>,
    {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                error!("Redis {} timed out after {:?}", operation, self.command_timeout);
                Err(SessionError::Persistence(format!(
                    "{} timed out after {:?}",
                    operation, self.command_timeout
                )))
            }
        }
    }
}

fn backend_error(operation: &str, key: &str, e: RedisError) -> SessionError {
    error!("Redis {} failed for {}: {}", operation, key, e);
    SessionError::Persistence(format!("{} failed: {}", operation, e))
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let key = session.storage_key();
        let payload = serde_json::to_string(session)
            .map_err(|e| SessionError::Persistence(format!("unable to encode session: {}", e)))?;

        self.bounded("save", async {
            let mut conn = self.connection().await?;
            redis::cmd("SET")
                .arg(&key)
                .arg(&payload)
                .arg("EX")
                .arg(self.ttl_seconds())
                .query_async::<()>(&mut conn)
                .await
                .map_err(|e| backend_error("save", &key, e))
        })
        .await
    }

    async fn get(&self, id: Uuid) -> Result<Session, SessionError> {
        let key = storage_key(id);

        // GET and EXPIRE travel in one MULTI/EXEC round trip, so a read is
        // never returned without its renewal.
        let (payload, renewed): (Option<String>, i64) = self
            .bounded("get", async {
                let mut conn = self.connection().await?;
                redis::pipe()
                    .atomic()
                    .cmd("GET")
                    .arg(&key)
                    .cmd("EXPIRE")
                    .arg(&key)
                    .arg(self.ttl_seconds())
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| backend_error("get", &key, e))
            })
            .await?;

        let Some(payload) = payload else {
            warn!("Session not found: {}", key);
            return Err(SessionError::NotFound(id));
        };

        if renewed != 1 {
            error!("Expiry renewal failed for {}", key);
            return Err(SessionError::Persistence(format!(
                "expiry renewal failed for {}",
                key
            )));
        }

        serde_json::from_str(&payload).map_err(|e| {
            error!("Failed to decode session {}: {}", key, e);
            SessionError::Persistence(format!("unable to decode session: {}", e))
        })
    }

    async fn refresh(&self, id: Uuid) -> Result<(), SessionError> {
        let key = storage_key(id);

        let renewed: i64 = self
            .bounded("refresh", async {
                let mut conn = self.connection().await?;
                redis::cmd("EXPIRE")
                    .arg(&key)
                    .arg(self.ttl_seconds())
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| backend_error("refresh", &key, e))
            })
            .await?;

        // EXPIRE answers 0 when the key does not exist
        if renewed == 0 {
            warn!("Session not found: {}", key);
            return Err(SessionError::NotFound(id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), SessionError> {
        self.bounded("ping", async {
            let mut conn = self.connection().await?;
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .map(|_| ())
                .map_err(|e| backend_error("ping", "PING", e))
        })
        .await
    }

    fn close(&self) {
        if self.pool.is_closed() {
            return;
        }
        self.pool.close();
        info!("Redis connection pool closed");
    }
}
