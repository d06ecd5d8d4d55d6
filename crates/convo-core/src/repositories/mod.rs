//! Capability traits (ports)

pub mod model_catalogue;
pub mod session_store;

pub use model_catalogue::ModelCatalogue;
pub use session_store::SessionStore;

#[cfg(test)]
pub use session_store::MockSessionStore;
