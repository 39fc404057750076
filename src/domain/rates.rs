//! Rate calculation over [`MetricsRecord`] counters.
//!
//! All functions are pure. A rate whose denominator is zero is defined as `0.0`,
//! so results are always finite.

use serde::{Deserialize, Serialize};

use crate::domain::entities::MetricsRecord;

/// Derived ratios for a metrics record, each nominally in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSet {
    pub delivery_rate: f64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub click_to_open_rate: f64,
    pub reply_rate: f64,
    pub bounce_rate: f64,
    pub unsubscribe_rate: f64,
    pub spam_rate: f64,
}

/// [`RateSet`] rendered as display percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedRates {
    pub delivery_rate: String,
    pub open_rate: String,
    pub click_rate: String,
    pub click_to_open_rate: String,
    pub reply_rate: String,
    pub bounce_rate: String,
    pub unsubscribe_rate: String,
    pub spam_rate: String,
}

/// Divides `numerator` by `denominator`, returning `0.0` for a zero denominator.
pub fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Computes every named rate for `metrics`.
///
/// Delivery and bounce are rated against `sent`, click-to-open against
/// `opened_tracked`; all other engagement rates are rated against `delivered`.
pub fn calculate_all_rates(metrics: &MetricsRecord) -> RateSet {
    RateSet {
        delivery_rate: rate(metrics.delivered, metrics.sent),
        open_rate: rate(metrics.opened_tracked, metrics.delivered),
        click_rate: rate(metrics.clicked_tracked, metrics.delivered),
        click_to_open_rate: rate(metrics.clicked_tracked, metrics.opened_tracked),
        reply_rate: rate(metrics.replied, metrics.delivered),
        bounce_rate: rate(metrics.bounced, metrics.sent),
        unsubscribe_rate: rate(metrics.unsubscribed, metrics.delivered),
        spam_rate: rate(metrics.spam_complaints, metrics.delivered),
    }
}

/// Renders a ratio as a percentage with one decimal place (`0.316 -> "31.6%"`).
pub fn format_rate_percent(rate: f64) -> String {
    let rate = if rate.is_finite() { rate } else { 0.0 };
    format!("{:.1}%", rate * 100.0)
}

impl RateSet {
    pub fn formatted(&self) -> FormattedRates {
        FormattedRates {
            delivery_rate: format_rate_percent(self.delivery_rate),
            open_rate: format_rate_percent(self.open_rate),
            click_rate: format_rate_percent(self.click_rate),
            click_to_open_rate: format_rate_percent(self.click_to_open_rate),
            reply_rate: format_rate_percent(self.reply_rate),
            bounce_rate: format_rate_percent(self.bounce_rate),
            unsubscribe_rate: format_rate_percent(self.unsubscribe_rate),
            spam_rate: format_rate_percent(self.spam_rate),
        }
    }
}
