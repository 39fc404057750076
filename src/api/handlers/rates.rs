//! Handler for ad-hoc rate calculation.

use axum::Json;
use axum::extract::rejection::JsonRejection;

use crate::api::dto::analytics::RatesResponse;
use crate::api::dto::envelope::ApiResponse;
use crate::domain::entities::MetricsRecord;
use crate::domain::rates::calculate_all_rates;
use crate::error::AppError;

/// Computes rates for the posted counters without touching storage.
///
/// # Endpoint
///
/// `POST /api/analytics/rates`
///
/// # Request Body
///
/// ```json
/// { "sent": 100, "delivered": 95, "opened_tracked": 30 }
/// ```
///
/// Missing counters default to zero.
pub async fn rates_handler(
    payload: Result<Json<MetricsRecord>, JsonRejection>,
) -> Result<Json<ApiResponse<RatesResponse>>, AppError> {
    let Json(metrics) = payload?;
    let rates = calculate_all_rates(&metrics);

    Ok(ApiResponse::ok(RatesResponse {
        formatted_rates: rates.formatted(),
        rates,
        funnel_warnings: metrics.funnel_warnings(),
    }))
}
