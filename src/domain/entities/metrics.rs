//! Raw outreach event counters.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Flat set of non-negative event counters for one entity (or an aggregate).
///
/// Later-funnel counters are expected to be at most the counter they are
/// rated against, but this is not enforced: see [`MetricsRecord::funnel_warnings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsRecord {
    pub sent: u64,
    pub delivered: u64,
    pub opened_tracked: u64,
    pub clicked_tracked: u64,
    pub replied: u64,
    pub bounced: u64,
    pub unsubscribed: u64,
    #[serde(rename = "spamComplaints")]
    pub spam_complaints: u64,
}

impl MetricsRecord {
    /// Returns `true` when every counter is zero.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Lists funnel pairs whose later stage exceeds the earlier one.
    ///
    /// The result is informational; callers report it alongside the data and
    /// never reject a record because of it.
    pub fn funnel_warnings(&self) -> Vec<String> {
        let checks: [(&str, u64, &str, u64); 7] = [
            ("delivered", self.delivered, "sent", self.sent),
            ("bounced", self.bounced, "sent", self.sent),
            ("opened_tracked", self.opened_tracked, "delivered", self.delivered),
            ("clicked_tracked", self.clicked_tracked, "delivered", self.delivered),
            ("replied", self.replied, "delivered", self.delivered),
            ("unsubscribed", self.unsubscribed, "delivered", self.delivered),
            ("spamComplaints", self.spam_complaints, "delivered", self.delivered),
        ];

        checks
            .into_iter()
            .filter(|(_, later, _, earlier)| later > earlier)
            .map(|(later_name, later, earlier_name, earlier)| {
                format!("{later_name} ({later}) exceeds {earlier_name} ({earlier})")
            })
            .collect()
    }
}

impl AddAssign for MetricsRecord {
    fn add_assign(&mut self, rhs: Self) {
        self.sent = self.sent.saturating_add(rhs.sent);
        self.delivered = self.delivered.saturating_add(rhs.delivered);
        self.opened_tracked = self.opened_tracked.saturating_add(rhs.opened_tracked);
        self.clicked_tracked = self.clicked_tracked.saturating_add(rhs.clicked_tracked);
        self.replied = self.replied.saturating_add(rhs.replied);
        self.bounced = self.bounced.saturating_add(rhs.bounced);
        self.unsubscribed = self.unsubscribed.saturating_add(rhs.unsubscribed);
        self.spam_complaints = self.spam_complaints.saturating_add(rhs.spam_complaints);
    }
}

impl Add for MetricsRecord {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sum for MetricsRecord {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
