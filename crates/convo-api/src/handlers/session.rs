// ============================================================================
// Convo API - Session Handlers
// File: crates/convo-api/src/handlers/session.rs
// ============================================================================
//! Session HTTP handlers (start, get, refresh)

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use convo_core::Session;

use crate::error::ApiError;
use crate::state::AppState;

/// Start session request payload
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub model: String,
}

fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("invalid session id: {}", e)))
}

/// POST /api/v1/session
pub async fn start_session(
    State(state): State<AppState>,
    payload: Result<Json<StartSessionRequest>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    // 1. Decode body
    let Json(body) = payload
        .map_err(|e| ApiError::BadRequest(format!("bad request body: {}", e.body_text())))?;

    // 2. Validate the model against the catalogue
    let models = state.catalogue.models().await?;
    if !models.iter().any(|m| m == &body.model) {
        return Err(ApiError::UnknownModel {
            model: body.model,
            available: models,
        });
    }

    // 3. Create and persist
    let session = state.sessions.create(&body.model).await?;
    Ok(Json(session))
}

/// GET /api/v1/session/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let id = parse_session_id(&id)?;
    let session = state.sessions.get(id).await?;
    Ok(Json(session))
}

/// PATCH /api/v1/session/{id}
pub async fn refresh_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_session_id(&id)?;
    state.sessions.refresh(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
