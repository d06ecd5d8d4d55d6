//! # Convo Core - Domain Module

pub mod session;

pub use session::{storage_key, Session, SESSION_KEY_PREFIX};
