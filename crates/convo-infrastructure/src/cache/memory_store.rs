use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use convo_core::domain::Session;
use convo_core::error::SessionError;
use convo_core::repositories::SessionStore;

/// Stored record: the serialized session plus its absolute expiry.
struct Entry {
    payload: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe in-process session store
/// Uses DashMap so each operation only holds the shard lock of its own key.
///
/// Expired records are removed when touched, and a full sweep runs on `save`
/// at most once per TTL window. Time comes from `tokio::time`, so a paused
/// test clock drives expiry.
#[derive(Clone)]
pub struct MemorySessionStore {
    entries: Arc<DashMap<Uuid, Entry>>,
    ttl: Duration,
    closed: Arc<AtomicBool>,
    last_sweep: Arc<Mutex<Instant>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        info!("Initializing in-memory session store (ttl: {:?})", ttl);
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            closed: Arc::new(AtomicBool::new(false)),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Number of records held, expired ones included until touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Persistence("session store is closed".to_string()));
        }
        Ok(())
    }

    /// Remove every expired record.
    /// Returns number of records removed
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let start_len = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let count = start_len.saturating_sub(self.entries.len());

        if count > 0 {
            info!("Cleaned up {} expired sessions", count);
        }

        count
    }

    /// Sweep if a full TTL window passed since the last sweep. Skipped while
    /// another caller holds the sweep lock.
    fn sweep_if_due(&self, now: Instant) {
        let Ok(mut last) = self.last_sweep.try_lock() else {
            return;
        };
        if now.duration_since(*last) < self.ttl {
            return;
        }
        *last = now;
        drop(last);

        self.cleanup_expired();
    }

    /// Drop the record if it is still expired.
    fn evict(&self, id: Uuid) {
        let removed = self
            .entries
            .remove_if(&id, |_, entry| entry.is_expired(Instant::now()));
        if removed.is_some() {
            debug!("Session {} expired, removed from store", id);
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        self.ensure_open()?;
        let payload = serde_json::to_string(session)
            .map_err(|e| SessionError::Persistence(format!("unable to encode session: {}", e)))?;

        let now = Instant::now();
        self.sweep_if_due(now);

        self.entries.insert(
            session.id(),
            Entry {
                payload,
                expires_at: now + self.ttl,
            },
        );
        debug!("Saved session {}", session.id());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Session, SessionError> {
        self.ensure_open()?;
        let now = Instant::now();

        let session = {
            let Some(mut entry) = self.entries.get_mut(&id) else {
                warn!("Session not found: {}", id);
                return Err(SessionError::NotFound(id));
            };

            if entry.is_expired(now) {
                drop(entry); // release the shard lock before removing
                self.evict(id);
                warn!("Session not found: {}", id);
                return Err(SessionError::NotFound(id));
            }

            let session: Session = serde_json::from_str(&entry.payload).map_err(|e| {
                SessionError::Persistence(format!("unable to decode session: {}", e))
            })?;
            entry.expires_at = now + self.ttl;
            session
        };

        Ok(session)
    }

    async fn refresh(&self, id: Uuid) -> Result<(), SessionError> {
        self.ensure_open()?;
        let now = Instant::now();

        let Some(mut entry) = self.entries.get_mut(&id) else {
            warn!("Session not found: {}", id);
            return Err(SessionError::NotFound(id));
        };

        if entry.is_expired(now) {
            drop(entry);
            self.evict(id);
            warn!("Session not found: {}", id);
            return Err(SessionError::NotFound(id));
        }

        entry.expires_at = now + self.ttl;
        Ok(())
    }

    async fn ping(&self) -> Result<(), SessionError> {
        self.ensure_open()
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.entries.clear();
            info!("In-memory session store closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = Session::new("llama3.2");

        store.save(&session).await.unwrap();
        assert_eq!(store.len(), 1);

        let loaded = store.get(session.id()).await.unwrap();
        assert_eq!(loaded, session);

        store.refresh(session.id()).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = Session::new("llama3.2");

        store.save(&session).await.unwrap();
        store.save(&session).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired_keeps_live_records() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let stale = Session::new("llama3.2");
        store.save(&stale).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        let fresh = Session::new("llama3.2");
        store.save(&fresh).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(fresh.id()).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = Session::new("llama3.2");
        store.save(&session).await.unwrap();

        store.close();
        store.close();

        assert!(store.is_empty());
        assert!(matches!(store.ping().await, Err(SessionError::Persistence(_))));
        assert!(matches!(
            store.get(session.id()).await,
            Err(SessionError::Persistence(_))
        ));
        assert!(matches!(
            store.save(&session).await,
            Err(SessionError::Persistence(_))
        ));
    }
}
