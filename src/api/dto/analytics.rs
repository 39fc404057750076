//! DTOs for analytics endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use validator::Validate;

use crate::domain::entities::{AnalyticsDomain, AnalyticsFilters, AnalyticsQuery};
use crate::domain::rates::{FormattedRates, RateSet};

/// Query string of the overview and breakdown endpoints.
///
/// `entity_ids` is a comma-separated list; blank items are ignored.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQueryParams {
    #[serde(default)]
    pub entity_ids: Option<String>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub days: Option<u32>,

    #[serde(default)]
    pub from: Option<NaiveDate>,

    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl AnalyticsQueryParams {
    pub fn entity_ids(&self) -> Vec<String> {
        self.entity_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn into_query(self, domain: AnalyticsDomain) -> AnalyticsQuery {
        let entity_ids = self.entity_ids();
        AnalyticsQuery::new(domain)
            .with_entities(entity_ids)
            .with_filters(AnalyticsFilters {
                days: self.days,
                from: self.from,
                to: self.to,
            })
    }
}

/// Request to register an entity.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterEntityRequest {
    #[validate(length(min = 1, max = 128))]
    pub entity_id: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterEntityResponse {
    pub domain: AnalyticsDomain,
    pub entity_id: String,
}

/// Result of applying an event delta.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventsResponse {
    pub entity_id: String,
    pub invalidated_entries: u64,
}

/// Rates computed for an ad-hoc counters payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesResponse {
    pub rates: RateSet,
    pub formatted_rates: FormattedRates,
    pub funnel_warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ids_are_split_and_trimmed() {
        let params = AnalyticsQueryParams {
            entity_ids: Some(" a, b,,c ".to_string()),
            ..Default::default()
        };

        assert_eq!(params.entity_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_entity_ids_means_all() {
        let params = AnalyticsQueryParams::default();
        assert!(params.entity_ids().is_empty());

        let query = params.into_query(AnalyticsDomain::Leads);
        assert_eq!(query.domain, AnalyticsDomain::Leads);
        assert!(query.filters.is_empty());
    }
}
