//! # Convo Infrastructure
//! 
//! Store and model catalogue implementations (adapters).

pub mod cache;
pub mod llm;

pub use cache::{MemorySessionStore, RedisSessionStore};
pub use llm::OllamaCatalogue;

use std::sync::Arc;
use std::time::Duration;

use convo_core::error::{CatalogueError, SessionError};
use convo_core::repositories::{ModelCatalogue, SessionStore};
use convo_shared::config::{Settings, StoreBackend};

/// Build the session store selected by `store.backend`.
pub fn build_session_store(settings: &Settings) -> Result<Arc<dyn SessionStore>, SessionError> {
    let ttl = settings.session.ttl();
    let store: Arc<dyn SessionStore> = match settings.store.backend {
        StoreBackend::Redis => Arc::new(RedisSessionStore::new(&settings.redis, ttl)?),
        StoreBackend::Memory => Arc::new(MemorySessionStore::new(ttl)),
    };
    Ok(store)
}

/// Build the model catalogue client.
pub fn build_model_catalogue(settings: &Settings) -> Result<Arc<dyn ModelCatalogue>, CatalogueError> {
    let catalogue = OllamaCatalogue::new(
        &settings.ollama.base_url,
        Duration::from_secs(settings.ollama.timeout_seconds),
    )?;
    Ok(Arc::new(catalogue))
}
