//! Domain errors

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SessionError {
    /// No record for the id. Expired and never-created sessions look the same.
    #[error("session not found: {0}")]
    NotFound(Uuid),

    #[error("session persistence error: {0}")]
    Persistence(String),
}

impl SessionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("model catalogue unreachable: {0}")]
    Unreachable(String),

    #[error("invalid model catalogue response: {0}")]
    InvalidResponse(String),
}
