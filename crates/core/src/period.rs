//! Reporting periods for KPI computation.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Inclusive time window `[start, end]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::validation(format!(
                "period end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The calendar month containing `now`, from the first instant of day 1 to the
    /// last second of the final day.
    pub fn current_month(now: DateTime<Utc>) -> Self {
        let first = first_of_month(now.year(), now.month());
        let (ny, nm) = next_month(now.year(), now.month());
        let next_first = first_of_month(ny, nm);
        Self {
            start: first,
            end: next_first - Duration::seconds(1),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Equal-length window ending one second before this one starts.
    pub fn preceding(&self) -> Self {
        let end = self.start - Duration::seconds(1);
        Self {
            start: end - self.duration(),
            end,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// Short label used in replies, e.g. `2026-10` for a calendar month.
    pub fn label(&self) -> String {
        let same_month = self.start.year() == self.end.year() && self.start.month() == self.end.month();
        if same_month {
            format!("{:04}-{:02}", self.start.year(), self.start.month())
        } else {
            format!("{} / {}", self.start.date_naive(), self.end.date_naive())
        }
    }
}

/// Days left in the month of `now`, today included (always >= 1).
pub fn days_remaining_in_month(now: DateTime<Utc>) -> u32 {
    let (ny, nm) = next_month(now.year(), now.month());
    let last_day = NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28);
    last_day.saturating_sub(now.day()) + 1
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 30, 0).unwrap()
    }

    #[test]
    fn current_month_spans_whole_calendar_month() {
        let p = Period::current_month(at(2026, 2, 14));
        assert_eq!(p.start, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(p.end, Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap());
        assert_eq!(p.label(), "2026-02");
    }

    #[test]
    fn december_rolls_into_next_year() {
        let p = Period::current_month(at(2026, 12, 3));
        assert_eq!(p.end, Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn preceding_window_has_equal_length_and_no_overlap() {
        let p = Period::current_month(at(2026, 10, 19));
        let prev = p.preceding();
        assert_eq!(prev.duration(), p.duration());
        assert!(prev.end < p.start);
    }

    #[test]
    fn days_remaining_counts_today() {
        assert_eq!(days_remaining_in_month(at(2026, 10, 19)), 13);
        assert_eq!(days_remaining_in_month(at(2026, 10, 31)), 1);
        assert_eq!(days_remaining_in_month(at(2028, 2, 1)), 29);
    }

    #[test]
    fn inverted_period_is_rejected() {
        assert!(Period::new(at(2026, 10, 2), at(2026, 10, 1)).is_err());
    }
}
