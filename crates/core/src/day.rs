//! Calendar-day windows.
//!
//! A `DayRange` is an immutable value computed once from an instant; nothing
//! mutates dates in place. The window is half-open: `[start, end)` where
//! `end` is the following midnight.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// The UTC calendar day containing some instant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DayRange {
    date: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayRange {
    /// The day window containing `instant`.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        let date = instant.date_naive();
        let start = date.and_time(NaiveTime::MIN).and_utc();
        Self {
            date,
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Inclusive lower bound (midnight).
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound (the following midnight).
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Compact `YYYYMMDD` form used in document numbers.
    pub fn yyyymmdd(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_covers_exactly_one_day() {
        let noon = Utc.with_ymd_and_hms(2025, 3, 14, 12, 30, 45).unwrap();
        let day = DayRange::containing(noon);

        assert!(day.contains(noon));
        assert!(day.contains(day.start()));
        assert!(!day.contains(day.end()));
        assert_eq!(day.end() - day.start(), Duration::days(1));
    }

    #[test]
    fn same_day_instants_share_a_window() {
        let early = Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 1).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 3, 14, 23, 59, 59).unwrap();
        assert_eq!(DayRange::containing(early), DayRange::containing(late));
    }

    #[test]
    fn compact_form_is_zero_padded() {
        let instant = Utc.with_ymd_and_hms(2025, 1, 5, 8, 0, 0).unwrap();
        assert_eq!(DayRange::containing(instant).yyyymmdd(), "20250105");
    }
}
