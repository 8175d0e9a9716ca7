//! Quarterly rebalancing windows.

use chrono::{Duration, NaiveDate};

/// Calendar days from a period's start to its end.
pub const PERIOD_LENGTH_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Contiguous, non-overlapping periods covering `[start, end]`.
///
/// Each period ends [`PERIOD_LENGTH_DAYS`] after it starts, the next starts
/// the day after, and the last one is clipped to `end`. Empty when
/// `start > end`.
pub fn quarterly_periods(start: NaiveDate, end: NaiveDate) -> Vec<QuarterPeriod> {
    let mut periods = Vec::new();
    let mut current = start;

    while current <= end {
        let period_end = (current + Duration::days(PERIOD_LENGTH_DAYS)).min(end);
        periods.push(QuarterPeriod {
            start_date: current,
            end_date: period_end,
        });
        current = period_end + Duration::days(1);
    }

    periods
}
