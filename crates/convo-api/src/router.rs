use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::handlers::{health, models, session};
use crate::state::AppState;

/// HTTP surface options.
#[derive(Debug, Clone, Copy)]
pub struct RouterOptions {
    pub request_timeout: Duration,
    /// Production logs request spans at debug instead of info.
    pub production: bool,
}

impl RouterOptions {
    fn trace_level(&self) -> Level {
        if self.production {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

pub fn build_router(state: AppState, options: RouterOptions) -> Router {
    let trace_level = options.trace_level();

    // Public routes
    let public_routes = Router::new().route("/healthcheck", get(health::health_check));

    // v1 api
    let v1_routes = Router::new()
        .route("/models", get(models::list_models))
        .route("/session", post(session::start_session))
        .route(
            "/session/{id}",
            get(session::get_session).patch(session::refresh_session),
        );

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", v1_routes)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            options.request_timeout,
        ))
        .layer(CatchPanicLayer::new())
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(trace_level))
                .on_response(DefaultOnResponse::new().level(trace_level)),
        )
}
