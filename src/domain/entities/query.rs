//! Analytics query model: what is being measured, for which entities, over which period.

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::AppError;

/// Entity IDs become part of cache keys and glob patterns, so separators and
/// glob metacharacters are excluded.
static ENTITY_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.@-]{1,128}$").unwrap());

/// The kind of entity a query aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsDomain {
    Campaigns,
    Mailboxes,
    Domains,
    Leads,
    Templates,
}

impl AnalyticsDomain {
    pub const ALL: [AnalyticsDomain; 5] = [
        Self::Campaigns,
        Self::Mailboxes,
        Self::Domains,
        Self::Leads,
        Self::Templates,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Campaigns => "campaigns",
            Self::Mailboxes => "mailboxes",
            Self::Domains => "domains",
            Self::Leads => "leads",
            Self::Templates => "templates",
        }
    }
}

impl fmt::Display for AnalyticsDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyticsDomain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| {
                AppError::bad_request("Unknown analytics domain", json!({ "domain": s }))
            })
    }
}

/// The shape of result a query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsOperation {
    /// Summed counters and rates across the selected entities.
    Overview,
    /// Counters and rates per entity.
    Breakdown,
}

impl AnalyticsOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Breakdown => "breakdown",
        }
    }
}

impl fmt::Display for AnalyticsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time filters applied to daily counters.
///
/// `days` selects a trailing window ending today; `from`/`to` bound the range
/// explicitly and take precedence over `days` for the side they set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalyticsFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl AnalyticsFilters {
    pub fn last_days(days: u32) -> Self {
        Self {
            days: Some(days),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_none() && self.from.is_none() && self.to.is_none()
    }

    /// Resolves the filters into an inclusive date range relative to `today`.
    pub fn date_range(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let from = self.from.or_else(|| {
            self.days
                .map(|days| today - Duration::days(i64::from(days.saturating_sub(1))))
        });
        (from, self.to)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(0) = self.days {
            return Err(AppError::bad_request(
                "days must be greater than 0",
                json!({ "days": 0 }),
            ));
        }
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(AppError::bad_request(
                "from must not be after to",
                json!({ "from": from, "to": to }),
            ));
        }
        Ok(())
    }
}

/// A fully specified analytics request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsQuery {
    pub domain: AnalyticsDomain,
    pub entity_ids: Vec<String>,
    pub filters: AnalyticsFilters,
}

impl AnalyticsQuery {
    pub fn new(domain: AnalyticsDomain) -> Self {
        Self {
            domain,
            entity_ids: Vec::new(),
            filters: AnalyticsFilters::default(),
        }
    }

    /// Sets the entity IDs, sorted and de-duplicated so that equal selections
    /// compare equal and echo back identically.
    pub fn with_entities(mut self, mut entity_ids: Vec<String>) -> Self {
        entity_ids.sort_unstable();
        entity_ids.dedup();
        self.entity_ids = entity_ids;
        self
    }

    pub fn with_filters(mut self, filters: AnalyticsFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Validates entity IDs and filters.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] with `VALIDATION_ERROR` on the first invalid part.
    pub fn validate(&self) -> Result<(), AppError> {
        for id in &self.entity_ids {
            validate_entity_id(id)?;
        }
        self.filters.validate()
    }
}

/// Checks that an entity ID is safe to embed in cache keys.
pub fn validate_entity_id(id: &str) -> Result<(), AppError> {
    if ENTITY_ID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(AppError::bad_request(
            "Invalid entity id",
            json!({ "entity_id": id }),
        ))
    }
}
