//! Handlers for analytics queries and event ingestion.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::analytics::{
    AnalyticsQueryParams, RecordEventsResponse, RegisterEntityRequest, RegisterEntityResponse,
};
use crate::api::dto::envelope::ApiResponse;
use crate::application::services::{AnalyticsBreakdown, AnalyticsOverview};
use crate::domain::entities::{AnalyticsDomain, MetricsRecord};
use crate::error::AppError;
use crate::state::AppState;

/// Aggregated metrics and rates for a domain.
///
/// # Endpoint
///
/// `GET /api/analytics/{domain}/overview`
///
/// # Query Parameters
///
/// - `entity_ids` (optional): Comma-separated entity IDs (default: all)
/// - `days` (optional): Trailing window ending today
/// - `from` / `to` (optional): Inclusive `YYYY-MM-DD` bounds
///
/// # Errors
///
/// Returns 400 for an unknown domain, malformed entity IDs or an empty date range.
pub async fn overview_handler(
    State(state): State<AppState>,
    domain: Result<Path<String>, PathRejection>,
    params: Result<Query<AnalyticsQueryParams>, QueryRejection>,
) -> Result<Json<ApiResponse<AnalyticsOverview>>, AppError> {
    let Path(domain) = domain?;
    let Query(params) = params?;
    let domain: AnalyticsDomain = domain.parse()?;

    let overview = state
        .analytics_service
        .overview(params.into_query(domain))
        .await?;

    Ok(ApiResponse::ok(overview))
}

/// Per-entity metrics and rates for a domain.
///
/// # Endpoint
///
/// `GET /api/analytics/{domain}/breakdown`
///
/// Accepts the same query parameters as the overview.
pub async fn breakdown_handler(
    State(state): State<AppState>,
    domain: Result<Path<String>, PathRejection>,
    params: Result<Query<AnalyticsQueryParams>, QueryRejection>,
) -> Result<Json<ApiResponse<AnalyticsBreakdown>>, AppError> {
    let Path(domain) = domain?;
    let Query(params) = params?;
    let domain: AnalyticsDomain = domain.parse()?;

    let breakdown = state
        .analytics_service
        .breakdown(params.into_query(domain))
        .await?;

    Ok(ApiResponse::ok(breakdown))
}

/// Registers an entity.
///
/// # Endpoint
///
/// `POST /api/analytics/{domain}/entities`
///
/// # Errors
///
/// Returns 409 if the entity already exists.
pub async fn register_entity_handler(
    State(state): State<AppState>,
    domain: Result<Path<String>, PathRejection>,
    payload: Result<Json<RegisterEntityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterEntityResponse>>), AppError> {
    let Path(domain) = domain?;
    let Json(payload) = payload?;
    payload.validate()?;
    let domain: AnalyticsDomain = domain.parse()?;

    state
        .analytics_service
        .register_entity(domain, &payload.entity_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(RegisterEntityResponse {
            domain,
            entity_id: payload.entity_id,
        }),
    ))
}

/// Adds a counters delta to today's bucket of an entity.
///
/// # Endpoint
///
/// `POST /api/analytics/{domain}/entities/{entity_id}/events`
///
/// # Request Body
///
/// ```json
/// { "sent": 10, "delivered": 9, "spamComplaints": 0 }
/// ```
///
/// # Errors
///
/// Returns 400 for an all-zero delta or an unregistered entity.
pub async fn record_events_handler(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    payload: Result<Json<MetricsRecord>, JsonRejection>,
) -> Result<Json<ApiResponse<RecordEventsResponse>>, AppError> {
    let Path((domain, entity_id)) = path?;
    let Json(delta) = payload?;
    let domain: AnalyticsDomain = domain.parse()?;

    let invalidated_entries = state
        .analytics_service
        .record_events(domain, &entity_id, delta)
        .await?;

    Ok(ApiResponse::ok(RecordEventsResponse {
        entity_id,
        invalidated_entries,
    }))
}
