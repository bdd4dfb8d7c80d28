use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Weeks fetched before and after the current week
const WEEKS_AROUND: i64 = 2;

/// Inclusive date range requested from the schedule provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ScheduleWindow {
    /// From the first day of the week two weeks before `today` to the last day
    /// of the week two weeks after it. Weeks run Sunday to Saturday.
    pub fn around(today: NaiveDate) -> Self {
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
        let start = week_start - Duration::weeks(WEEKS_AROUND);
        let end = week_start + Duration::weeks(WEEKS_AROUND) + Duration::days(6);
        Self { start, end }
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}
