use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/v1/models
pub async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let models = state.catalogue.models().await?;
    Ok(Json(models))
}
