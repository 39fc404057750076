//! DTOs for cache management endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::AnalyticsDomain;

/// Invalidation scope.
///
/// No domain clears every analytics entry; a domain without entity IDs clears
/// that domain; both together clear entries touching those entities.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub domain: Option<AnalyticsDomain>,

    #[serde(default)]
    #[validate(length(max = 500))]
    pub entity_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateResponse {
    pub deleted_entries: u64,
}
