//! Session store trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Session;
use crate::error::SessionError;

/// TTL-backed persistence for sessions.
///
/// Every successful `save`, `get` and `refresh` resets the record's expiry to
/// the store's full TTL window. Implementations hold no per-session state in
/// process and must tolerate concurrent calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write the session under `session:<id>`, replacing any existing record.
    async fn save(&self, session: &Session) -> Result<(), SessionError>;

    /// Read the session and renew its expiry in the same backend operation.
    async fn get(&self, id: Uuid) -> Result<Session, SessionError>;

    /// Renew the expiry without reading the payload.
    async fn refresh(&self, id: Uuid) -> Result<(), SessionError>;

    /// Cheap reachability probe.
    async fn ping(&self) -> Result<(), SessionError>;

    /// Release backend resources. Safe to call more than once.
    fn close(&self);
}
