// ============================================================================
// Convo Core - Session Manager
// File: crates/convo-core/src/services/session_manager.rs
// ============================================================================
//! Session lifecycle service: mints sessions and delegates persistence

use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::Session;
use crate::error::SessionError;
use crate::repositories::SessionStore;

/// Creates, looks up and renews sessions.
///
/// The manager is the only place ids and timestamps are minted. It keeps no
/// session map: the store is the source of truth, so one manager can be
/// shared by every request handler.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Start a session bound to `model`.
    ///
    /// The model name is not checked against any catalogue here.
    pub async fn create(&self, model: &str) -> Result<Session, SessionError> {
        let session = Session::new(model);

        if let Err(e) = self.store.save(&session).await {
            error!("Failed to save session {}: {}", session.id(), e);
            let reason = match e {
                SessionError::Persistence(msg) => msg,
                other => other.to_string(),
            };
            return Err(SessionError::Persistence(format!("unable to save session: {}", reason)));
        }

        info!("Session {} created for model {}", session.id(), session.model());
        Ok(session)
    }

    /// Look up a session, renewing its expiry.
    pub async fn get(&self, id: Uuid) -> Result<Session, SessionError> {
        let session = self.store.get(id).await?;
        debug!("Session {} retrieved", id);
        Ok(session)
    }

    /// Renew a session's expiry without reading it.
    pub async fn refresh(&self, id: Uuid) -> Result<(), SessionError> {
        self.store.refresh(id).await?;
        debug!("Session {} refreshed", id);
        Ok(())
    }

    /// Write back a caller-constructed session.
    pub async fn save(&self, session: &Session) -> Result<(), SessionError> {
        self.store.save(session).await
    }
}
