//! Usage Snapshots and Period Rollover
//!
//! A snapshot is a value: every operation here returns a new snapshot and
//! leaves its input untouched. Persisting the result is the caller's job.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::feature::Feature;

/// Usage counters for one account in the current period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Reports generated this period
    pub reports_used: u32,

    /// AI questions asked this period
    pub ai_questions_used: u32,

    /// Saved properties counted into this period
    pub saved_properties: u32,

    /// Date on which the counters reset to zero
    pub period_resets_on: NaiveDate,
}

impl UsageSnapshot {
    /// Create an empty snapshot that resets on the given date
    pub fn new(period_resets_on: NaiveDate) -> Self {
        Self {
            reports_used: 0,
            ai_questions_used: 0,
            saved_properties: 0,
            period_resets_on,
        }
    }

    /// Create an empty snapshot for a period that contains `today`
    pub fn starting(today: NaiveDate) -> Self {
        Self::new(next_period_start(today))
    }

    /// Counter value for a metered feature, `None` for the others
    pub fn used(&self, feature: Feature) -> Option<u32> {
        match feature {
            Feature::Report => Some(self.reports_used),
            Feature::AiQuestion => Some(self.ai_questions_used),
            Feature::SaveProperty | Feature::ExportPdf => None,
        }
    }

    /// Copy with the counter for `feature` bumped by one.
    ///
    /// Non-metered features return an unchanged copy.
    pub(crate) fn incremented(&self, feature: Feature) -> Self {
        let mut next = *self;
        match feature {
            Feature::Report => next.reports_used = next.reports_used.saturating_add(1),
            Feature::AiQuestion => {
                next.ai_questions_used = next.ai_questions_used.saturating_add(1)
            }
            Feature::SaveProperty | Feature::ExportPdf => {}
        }
        next
    }

    /// Copy with one more property saved this period
    pub(crate) fn with_saved_property(&self) -> Self {
        let mut next = *self;
        next.saved_properties = next.saved_properties.saturating_add(1);
        next
    }

    /// Whether `today` has reached the period boundary
    pub fn is_rollover_due(&self, today: NaiveDate) -> bool {
        today >= self.period_resets_on
    }

    /// Reset the counters if the period has elapsed.
    ///
    /// On rollover every counter goes back to zero and the boundary moves to
    /// the first day of the month after `today`. Applying it twice with the
    /// same `today` gives the same result as applying it once.
    ///
    /// The new boundary is strictly after `today` for every date up to the
    /// last month chrono can represent. Within that final month it saturates
    /// at `NaiveDate::MAX`, so `rollover_if_due(NaiveDate::MAX)` leaves a
    /// boundary equal to `today`.
    pub fn rollover_if_due(&self, today: NaiveDate) -> Self {
        if !self.is_rollover_due(today) {
            return *self;
        }

        tracing::debug!(
            "Usage period ended on {}, next reset on {}",
            self.period_resets_on,
            next_period_start(today)
        );
        Self::starting(today)
    }
}

/// First day of the calendar month following `date`.
///
/// Saturates at `NaiveDate::MAX` at the end of the representable range.
pub fn next_period_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .unwrap_or(NaiveDate::MAX)
}
