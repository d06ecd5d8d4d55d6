//! Session domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_KEY_PREFIX: &str = "session:";

/// A conversation context bound to one language model.
///
/// Fields are private: once minted, a session's identity, creation time and
/// model never change. Only its remaining lifetime in the store does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    model: String,
}

impl Session {
    /// Mint a new session with a fresh id, stamped with the current UTC time.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            model: model.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn storage_key(&self) -> String {
        storage_key(self.id)
    }
}

/// Backend key for a session id: `session:<uuid>`.
pub fn storage_key(id: Uuid) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let before = Utc::now();
        let session = Session::new("llama3.2:latest");

        assert_eq!(session.model(), "llama3.2:latest");
        assert!(session.created_at() >= before);
        assert!(session.created_at() <= Utc::now());
        assert_ne!(session.id(), Uuid::nil());
    }

    #[test]
    fn test_storage_key() {
        let id = Uuid::parse_str("7b0e6c55-3a4f-4d2e-9a61-0c3d1f2e8b90").unwrap();
        assert_eq!(storage_key(id), "session:7b0e6c55-3a4f-4d2e-9a61-0c3d1f2e8b90");

        let session = Session::new("mistral");
        assert_eq!(session.storage_key(), format!("session:{}", session.id()));
    }

    #[test]
    fn test_serialized_shape() {
        let session = Session::new("qwen2.5");
        let value = serde_json::to_value(&session).unwrap();

        assert_eq!(value["id"], session.id().to_string());
        assert_eq!(value["model"], "qwen2.5");
        let created_at = value["created_at"].as_str().unwrap();
        assert!(created_at.ends_with('Z'));

        let decoded: Session = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, session);
    }
}
