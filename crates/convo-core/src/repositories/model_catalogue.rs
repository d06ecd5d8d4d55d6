//! Model catalogue trait (port)

use async_trait::async_trait;

use crate::error::CatalogueError;

#[async_trait]
pub trait ModelCatalogue: Send + Sync {
    /// Names of the models currently available, sorted ascending.
    async fn models(&self) -> Result<Vec<String>, CatalogueError>;

    /// Cheap reachability probe.
    async fn heartbeat(&self) -> Result<(), CatalogueError>;
}
