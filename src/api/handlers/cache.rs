//! Handlers for cache management.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use validator::Validate;

use crate::api::dto::cache::{InvalidateRequest, InvalidateResponse};
use crate::api::dto::envelope::ApiResponse;
use crate::application::warming::WarmingReport;
use crate::error::AppError;
use crate::state::AppState;

/// Invalidates cached analytics.
///
/// # Endpoint
///
/// `POST /api/cache/invalidate`
///
/// # Request Body
///
/// ```json
/// { "domain": "campaigns", "entity_ids": ["c1"] }
/// ```
///
/// An empty body `{}` clears every analytics entry.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    payload: Result<Json<InvalidateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<InvalidateResponse>>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let deleted_entries = state
        .analytics_service
        .invalidate(payload.domain, &payload.entity_ids)
        .await?;

    Ok(ApiResponse::ok(InvalidateResponse { deleted_entries }))
}

/// Runs one cache warming pass and reports per-task outcomes.
///
/// # Endpoint
///
/// `POST /api/cache/warm`
pub async fn warm_handler(State(state): State<AppState>) -> Json<ApiResponse<WarmingReport>> {
    ApiResponse::ok(state.warming.run_once().await)
}
