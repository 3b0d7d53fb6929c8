//! Absolute and relative date ranges.
//!
//! Date fields carry either a [`DateRange`] in epoch milliseconds or a
//! [`RelativeDate`] that is resolved against "now". Resolution is not
//! idempotent across calls because "now" advances, so compilers capture one
//! instant per request and resolve every relative date against it.
//!
//! Month and year arithmetic follows calendar rollover: the day of month is
//! kept and overflow spills into the following month, so one month before
//! March 30 lands on March 2 in a non-leap year.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Inclusive range of epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "date-range")]
pub struct DateRange {
    pub from: i64,
    pub to: i64,
}

impl DateRange {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.from && timestamp <= self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "minutes" => Some(TimeUnit::Minutes),
            "hours" => Some(TimeUnit::Hours),
            "days" => Some(TimeUnit::Days),
            "weeks" => Some(TimeUnit::Weeks),
            "months" => Some(TimeUnit::Months),
            "years" => Some(TimeUnit::Years),
            _ => None,
        }
    }
}

/// "The last `num` `unit`s", e.g. `{unit: months, num: 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "relative-date")]
pub struct RelativeDate {
    pub unit: TimeUnit,
    pub num: i64,
}

impl RelativeDate {
    pub fn new(unit: TimeUnit, num: i64) -> Self {
        Self { unit, num }
    }

    /// Resolves against the current instant.
    pub fn resolve(&self) -> DateRange {
        resolve_relative_date(self, Utc::now())
    }

    pub fn resolve_at(&self, now: DateTime<Utc>) -> DateRange {
        resolve_relative_date(self, now)
    }
}

/// Converts a relative date into an absolute range ending at `now`.
pub fn resolve_relative_date(relative: &RelativeDate, now: DateTime<Utc>) -> DateRange {
    let to = now.timestamp_millis();
    let from = match relative.unit {
        TimeUnit::Minutes => to.saturating_sub(relative.num.saturating_mul(MINUTE_MS)),
        TimeUnit::Hours => to.saturating_sub(relative.num.saturating_mul(HOUR_MS)),
        TimeUnit::Days => to.saturating_sub(relative.num.saturating_mul(DAY_MS)),
        TimeUnit::Weeks => to.saturating_sub(relative.num.saturating_mul(WEEK_MS)),
        TimeUnit::Months => subtract_calendar_months(now, relative.num),
        TimeUnit::Years => subtract_calendar_months(now, relative.num.saturating_mul(12)),
    };
    DateRange { from, to }
}

/// Moves `now` back by `months` calendar months, rolling an out-of-range day
/// of month forward into the next month. Clamps to the earliest representable
/// instant when the target falls outside chrono's range.
fn subtract_calendar_months(now: DateTime<Utc>, months: i64) -> i64 {
    shift_months(now, months)
        .map(|shifted| shifted.timestamp_millis())
        .unwrap_or(DateTime::<Utc>::MIN_UTC.timestamp_millis())
}

fn shift_months(now: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let total = i64::from(now.year())
        .checked_mul(12)?
        .checked_add(i64::from(now.month0()))?
        .checked_sub(months)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first.checked_add_signed(Duration::days(i64::from(now.day0())))?;
    Some(date.and_time(now.time()).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn days_are_fixed_duration() {
        let now = at(2024, 6, 15);
        let range = RelativeDate::new(TimeUnit::Days, 3).resolve_at(now);
        assert_eq!(range.to, now.timestamp_millis());
        assert_eq!(range.to - range.from, 3 * DAY_MS);
    }

    #[test]
    fn weeks_and_hours() {
        let now = at(2024, 6, 15);
        let weeks = RelativeDate::new(TimeUnit::Weeks, 2).resolve_at(now);
        assert_eq!(weeks.to - weeks.from, 14 * DAY_MS);
        let hours = RelativeDate::new(TimeUnit::Hours, 5).resolve_at(now);
        assert_eq!(hours.to - hours.from, 5 * HOUR_MS);
        let minutes = RelativeDate::new(TimeUnit::Minutes, 90).resolve_at(now);
        assert_eq!(minutes.to - minutes.from, 90 * MINUTE_MS);
    }

    #[test]
    fn from_is_before_to_for_positive_days() {
        let now = Utc::now();
        for num in 1..40 {
            let range = RelativeDate::new(TimeUnit::Days, num).resolve_at(now);
            assert!(range.from < range.to);
            assert_eq!(range.to, now.timestamp_millis());
        }
    }

    #[test]
    fn month_subtraction_rolls_over_short_months() {
        let range = RelativeDate::new(TimeUnit::Months, 1).resolve_at(at(2023, 3, 30));
        assert_eq!(range.from, at(2023, 3, 2).timestamp_millis());

        let leap = RelativeDate::new(TimeUnit::Months, 1).resolve_at(at(2024, 3, 30));
        assert_eq!(leap.from, at(2024, 3, 1).timestamp_millis());
    }

    #[test]
    fn month_subtraction_crosses_year_boundary() {
        let range = RelativeDate::new(TimeUnit::Months, 2).resolve_at(at(2024, 1, 15));
        assert_eq!(range.from, at(2023, 11, 15).timestamp_millis());
    }

    #[test]
    fn year_subtraction_from_leap_day() {
        let range = RelativeDate::new(TimeUnit::Years, 1).resolve_at(at(2024, 2, 29));
        assert_eq!(range.from, at(2023, 3, 1).timestamp_millis());
    }

    #[test]
    fn serializes_with_type_tags() {
        let value = serde_json::to_value(DateRange::new(1, 2)).unwrap();
        assert_eq!(value, serde_json::json!({"type": "date-range", "from": 1, "to": 2}));
        let value = serde_json::to_value(RelativeDate::new(TimeUnit::Months, 1)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "relative-date", "unit": "months", "num": 1})
        );
    }
}
