//! # Convo Core
//! 
//! Session entity, storage and model catalogue ports, and the session manager.

pub mod domain;
pub mod error;
pub mod repositories;
pub mod services;

pub use domain::Session;
pub use error::{CatalogueError, SessionError};
pub use repositories::{ModelCatalogue, SessionStore};
pub use services::SessionManager;
