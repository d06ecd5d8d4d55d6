// ============================================================================
// Convo Server - Lifecycle
// File: convo-app/convo-server/src/lifecycle.rs
// ============================================================================
//! Process lifecycle: dependency checks, serving, bounded drain, store release
//!
//! `Starting -> Serving -> Draining -> Stopped`. A failed probe goes straight
//! from `Starting` to `Stopped`; a failed listener skips the signal wait.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use convo_api::{build_router, AppState, RouterOptions};
use convo_core::{ModelCatalogue, SessionManager, SessionStore};
use convo_shared::config::LifecycleSettings;

pub const MODEL_CATALOGUE: &str = "model catalogue";
pub const SESSION_STORE: &str = "session store";

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("{dependency} unreachable at startup: {reason}")]
    StartupDependencyUnreachable {
        dependency: &'static str,
        reason: String,
    },

    #[error("failed to bind listener: {0}")]
    Bind(#[source] io::Error),

    #[error("listener failed: {0}")]
    Listener(#[source] io::Error),

    #[error("in-flight requests did not drain within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("lifecycle task failed: {0}")]
    Task(String),
}

fn dependency_unreachable(dependency: &'static str, reason: impl Into<String>) -> LifecycleError {
    let reason = reason.into();
    error!("{} unreachable: {}", dependency, reason);
    LifecycleError::StartupDependencyUnreachable { dependency, reason }
}

#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    startup_timeout: Duration,
    shutdown_grace: Duration,
}

impl Lifecycle {
    pub fn new(startup_timeout: Duration, shutdown_grace: Duration) -> Self {
        Self {
            startup_timeout,
            shutdown_grace,
        }
    }

    pub fn from_settings(settings: &LifecycleSettings) -> Self {
        Self::new(settings.startup_timeout(), settings.shutdown_grace())
    }

    /// Probe the catalogue, then the store, under one shared deadline.
    pub async fn check_dependencies(
        &self,
        catalogue: &dyn ModelCatalogue,
        store: &dyn SessionStore,
    ) -> Result<(), LifecycleError> {
        let deadline = Instant::now() + self.startup_timeout;

        match timeout_at(deadline, catalogue.heartbeat()).await {
            Ok(Ok(())) => info!("✅ {} is reachable", MODEL_CATALOGUE),
            Ok(Err(e)) => return Err(dependency_unreachable(MODEL_CATALOGUE, e.to_string())),
            Err(_) => {
                return Err(dependency_unreachable(
                    MODEL_CATALOGUE,
                    format!("no answer within {:?}", self.startup_timeout),
                ))
            }
        }

        match timeout_at(deadline, store.ping()).await {
            Ok(Ok(())) => info!("✅ {} is reachable", SESSION_STORE),
            Ok(Err(e)) => return Err(dependency_unreachable(SESSION_STORE, e.to_string())),
            Err(_) => {
                return Err(dependency_unreachable(
                    SESSION_STORE,
                    format!("no answer within {:?}", self.startup_timeout),
                ))
            }
        }

        Ok(())
    }

    /// Check dependencies, bind `addr` and serve until `shutdown` resolves.
    ///
    /// The store is closed exactly once on every path out of this function.
    pub async fn run<F>(
        &self,
        addr: SocketAddr,
        options: RouterOptions,
        catalogue: Arc<dyn ModelCatalogue>,
        store: Arc<dyn SessionStore>,
        shutdown: F,
    ) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Err(e) = self
            .check_dependencies(catalogue.as_ref(), store.as_ref())
            .await
        {
            store.close();
            return Err(e);
        }

        let sessions = Arc::new(SessionManager::new(store.clone()));
        let app = build_router(AppState::new(sessions, catalogue), options);

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind {}: {}", addr, e);
                store.close();
                return Err(LifecycleError::Bind(e));
            }
        };

        self.serve(listener, app, store, shutdown).await
    }

    /// Serve `app` on `listener` until `shutdown` resolves or the listener fails,
    /// then give in-flight requests `shutdown_grace` to finish and close `store`.
    pub async fn serve<F>(
        &self,
        listener: TcpListener,
        app: Router,
        store: Arc<dyn SessionStore>,
        shutdown: F,
    ) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match listener.local_addr() {
            Ok(addr) => info!("🎯 Server listening on {}", addr),
            Err(e) => warn!("Server listening on an unknown address: {}", e),
        }

        let token = CancellationToken::new();
        let (stopped_tx, stopped_rx) = oneshot::channel::<()>();

        let serve_token = token.clone();
        let serve_task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(serve_token.clone().cancelled_owned())
                .await;
            let _ = stopped_tx.send(());

            match result {
                Ok(()) => {
                    if !serve_token.is_cancelled() {
                        warn!("Listener stopped without a shutdown request");
                        serve_token.cancel();
                    }
                    Ok(())
                }
                Err(e) => {
                    error!("Listener failed: {}", e);
                    serve_token.cancel();
                    Err(LifecycleError::Listener(e))
                }
            }
        });

        let grace = self.shutdown_grace;
        let abort = serve_task.abort_handle();
        let shutdown_token = token.clone();
        let shutdown_task = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown => info!("Shutdown requested, draining in-flight requests (grace: {:?})", grace),
                _ = shutdown_token.cancelled() => info!("Listener stopped, shutting down"),
            }
            shutdown_token.cancel();

            // a dropped sender means the serve task is already gone
            match timeout(grace, stopped_rx).await {
                Ok(_) => {
                    info!("Listener drained");
                    Ok(())
                }
                Err(_) => {
                    error!("Drain exceeded {:?}, aborting listener", grace);
                    abort.abort();
                    Err(LifecycleError::ShutdownTimeout(grace))
                }
            }
        });

        let served = match serve_task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(LifecycleError::Task(e.to_string())),
        };
        // unblocks the shutdown task if the serve task died without cancelling
        token.cancel();

        let drained = shutdown_task
            .await
            .unwrap_or_else(|e| Err(LifecycleError::Task(e.to_string())));

        store.close();
        info!("Session store released");

        served.and(drained)
    }
}

/// Resolves on SIGTERM or SIGINT, or Ctrl+C where unix signals are unavailable.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown..."),
                    _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown..."),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers, falling back to Ctrl+C: {}", e);
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use convo_core::CatalogueError;
    use convo_infrastructure::MemorySessionStore;

    struct FixedCatalogue(Result<(), String>);

    #[async_trait]
    impl ModelCatalogue for FixedCatalogue {
        async fn models(&self) -> Result<Vec<String>, CatalogueError> {
            Ok(vec![])
        }

        async fn heartbeat(&self) -> Result<(), CatalogueError> {
            self.0.clone().map_err(CatalogueError::Unreachable)
        }
    }

    fn lifecycle() -> Lifecycle {
        Lifecycle::new(Duration::from_millis(500), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_dependencies_reachable() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let result = lifecycle()
            .check_dependencies(&FixedCatalogue(Ok(())), &store)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_catalogue_failure_is_reported_first() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.close();

        let err = lifecycle()
            .check_dependencies(&FixedCatalogue(Err("connection refused".into())), &store)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::StartupDependencyUnreachable { dependency: MODEL_CATALOGUE, .. }
        ));
    }

    #[tokio::test]
    async fn test_store_failure() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.close();

        let err = lifecycle()
            .check_dependencies(&FixedCatalogue(Ok(())), &store)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::StartupDependencyUnreachable { dependency: SESSION_STORE, .. }
        ));
    }

    #[test]
    fn test_from_settings() {
        let settings = LifecycleSettings {
            startup_timeout_ms: 250,
            shutdown_grace_seconds: 3,
        };
        let lifecycle = Lifecycle::from_settings(&settings);
        assert_eq!(lifecycle.startup_timeout, Duration::from_millis(250));
        assert_eq!(lifecycle.shutdown_grace, Duration::from_secs(3));
    }
}
