//! Named reporting periods and the start-of-window computation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month, OffsetDateTime, Weekday};

use crate::Error;

/// The day of the month a salary cycle nominally starts on.
const SALARY_DAY: u8 = 10;

/// A named time window used to bound aggregate queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// The last seven days, ending now.
    Week,
    /// The current calendar month.
    Month,
    /// The current calendar year.
    Year,
    /// Unbounded.
    All,
    /// The current salary cycle (see [Period::resolve]).
    Salary,
}

impl Period {
    /// The period used when a query does not name one.
    pub const DEFAULT: Period = Period::Month;

    /// Compute the inclusive lower bound of the window ending at `now`, or
    /// `None` when the window is unbounded.
    ///
    /// The salary cycle starts on the 10th of each month, rolled backward
    /// one day at a time while the candidate lands on a Saturday or Sunday
    /// (no holiday calendar). When `now` falls before the current month's
    /// candidate, the active cycle began at the previous month's candidate.
    ///
    /// Pure and deterministic given `now`. Bounds other than `Week` are
    /// date-granular: they point at midnight in `now`'s offset.
    pub fn resolve(self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        let start_date = match self {
            Period::Week => return Some(now - Duration::days(7)),
            Period::All => return None,
            Period::Month => first_of_month(now.date().year(), now.date().month()),
            Period::Year => first_of_month(now.date().year(), Month::January),
            Period::Salary => salary_period_start(now.date()),
        };

        Some(start_date.midnight().assume_offset(now.offset()))
    }

    /// A short human-readable name for the window.
    pub fn label(self) -> &'static str {
        match self {
            Period::Week => "Last 7 days",
            Period::Month => "Current month",
            Period::Year => "Current year",
            Period::All => "All time",
            Period::Salary => "Current salary period",
        }
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            "all" => Ok(Period::All),
            "salary" => Ok(Period::Salary),
            _ => Err(Error::InvalidPeriod(s.to_string())),
        }
    }
}

fn first_of_month(year: i32, month: Month) -> Date {
    Date::from_calendar_date(year, month, 1).expect("invalid month start date")
}

/// The adjusted salary day for the given month: the 10th, rolled backward
/// to the nearest weekday when it falls on a weekend.
fn salary_day(year: i32, month: Month) -> Date {
    let mut candidate =
        Date::from_calendar_date(year, month, SALARY_DAY).expect("invalid salary date");

    while matches!(candidate.weekday(), Weekday::Saturday | Weekday::Sunday) {
        candidate = candidate
            .previous_day()
            .expect("salary day rolled past the calendar start");
    }

    candidate
}

/// The start date of the salary cycle that `today` falls in.
fn salary_period_start(today: Date) -> Date {
    let candidate = salary_day(today.year(), today.month());

    if today < candidate {
        let (year, month) = match today.month() {
            Month::January => (today.year() - 1, Month::December),
            month => (today.year(), month.previous()),
        };

        salary_day(year, month)
    } else {
        candidate
    }
}

#[cfg(test)]
mod period_tests {
    use std::str::FromStr;

    use time::macros::{date, datetime};

    use crate::Error;

    use super::{Period, salary_day};

    #[test]
    fn week_resolves_to_seven_days_before_now() {
        let now = datetime!(2026-02-09 12:34:56 UTC);

        assert_eq!(
            Period::Week.resolve(now),
            Some(datetime!(2026-02-02 12:34:56 UTC))
        );
    }

    #[test]
    fn month_resolves_to_first_instant_of_month() {
        let now = datetime!(2026-02-09 12:34:56 UTC);

        assert_eq!(
            Period::Month.resolve(now),
            Some(datetime!(2026-02-01 0:00 UTC))
        );
    }

    #[test]
    fn year_resolves_to_first_instant_of_year() {
        let now = datetime!(2026-08-15 23:59:59 UTC);

        assert_eq!(
            Period::Year.resolve(now),
            Some(datetime!(2026-01-01 0:00 UTC))
        );
    }

    #[test]
    fn all_resolves_to_unbounded() {
        let now = datetime!(2026-02-09 12:34:56 UTC);

        assert_eq!(Period::All.resolve(now), None);
    }

    #[test]
    fn salary_day_stays_on_weekday_tenth() {
        // 10 December 2025 is a Wednesday.
        assert_eq!(salary_day(2025, time::Month::December), date!(2025-12-10));
    }

    #[test]
    fn salary_day_rolls_weekend_back_to_friday() {
        // 10 January 2026 is a Saturday, so pay lands on Friday the 9th.
        assert_eq!(salary_day(2026, time::Month::January), date!(2026-01-09));
        // 10 May 2026 is a Sunday, rolling back over Saturday to Friday the 8th.
        assert_eq!(salary_day(2026, time::Month::May), date!(2026-05-08));
    }

    #[test]
    fn salary_before_payday_uses_previous_cycle() {
        // 10 February 2026 is a Tuesday; on the 9th the January cycle is
        // still active, and January's payday rolled back to Friday the 9th.
        let now = datetime!(2026-02-09 8:00 UTC);

        assert_eq!(
            Period::Salary.resolve(now),
            Some(datetime!(2026-01-09 0:00 UTC))
        );
    }

    #[test]
    fn salary_on_payday_starts_new_cycle() {
        let now = datetime!(2026-02-10 0:00 UTC);

        assert_eq!(
            Period::Salary.resolve(now),
            Some(datetime!(2026-02-10 0:00 UTC))
        );
    }

    #[test]
    fn salary_rolls_over_year_boundary() {
        // 5 January 2026 is before January's payday (Friday the 9th), so the
        // active cycle began on December 2025's payday.
        let now = datetime!(2026-01-05 18:30 UTC);

        assert_eq!(
            Period::Salary.resolve(now),
            Some(datetime!(2025-12-10 0:00 UTC))
        );
    }

    #[test]
    fn salary_mid_cycle_uses_current_month() {
        let now = datetime!(2026-05-15 10:00 UTC);

        assert_eq!(
            Period::Salary.resolve(now),
            Some(datetime!(2026-05-08 0:00 UTC))
        );
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!(Period::from_str("WEEK").unwrap(), Period::Week);
        assert_eq!(Period::from_str(" salary ").unwrap(), Period::Salary);
    }

    #[test]
    fn from_str_rejects_unknown_period() {
        assert_eq!(
            Period::from_str("decade"),
            Err(Error::InvalidPeriod("decade".to_string()))
        );
    }
}
