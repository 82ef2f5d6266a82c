// libs/appointment-cell/src/services/policy.rs
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Weekday};
use thiserror::Error;

use crate::models::{AppointmentError, BookingRules};

/// Why a calendar day cannot be booked. The first failing check wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DateRejection {
    #[error("past date")]
    PastDate,

    #[error("exceeds advance-booking horizon")]
    BeyondHorizon,

    #[error("closed on Sundays")]
    ClosedOnSunday,
}

impl From<DateRejection> for AppointmentError {
    fn from(rejection: DateRejection) -> Self {
        AppointmentError::InvalidDate(rejection.to_string())
    }
}

/// Date-level booking rules, evaluated against the clinic's local clock.
#[derive(Debug, Clone, Copy)]
pub struct BookingPolicy {
    rules: BookingRules,
}

impl BookingPolicy {
    pub fn new(rules: BookingRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    pub fn validate_date(&self, date: NaiveDate, now: NaiveDateTime) -> Result<(), DateRejection> {
        let today = now.date();

        if date < today {
            return Err(DateRejection::PastDate);
        }
        let horizon = TimeDelta::try_days(self.rules.max_advance_days)
            .and_then(|span| today.checked_add_signed(span));
        if horizon.is_some_and(|last| date > last) {
            return Err(DateRejection::BeyondHorizon);
        }
        if date.weekday() == Weekday::Sun {
            return Err(DateRejection::ClosedOnSunday);
        }

        Ok(())
    }

    /// Slots starting strictly before this instant are too close to book.
    /// A lead time past the end of the calendar leaves nothing bookable.
    pub fn lead_time_cutoff(&self, now: NaiveDateTime) -> NaiveDateTime {
        TimeDelta::try_hours(self.rules.min_advance_hours)
            .and_then(|lead| now.checked_add_signed(lead))
            .unwrap_or(NaiveDateTime::MAX)
    }

    /// The next `count` open days starting at `today`, looking no further than
    /// `count + 7` calendar days ahead.
    pub fn upcoming_bookable_dates(&self, today: NaiveDate, count: u32) -> Vec<NaiveDate> {
        today
            .iter_days()
            .take(count as usize + 7)
            .filter(|date| date.weekday() != Weekday::Sun)
            .take(count as usize)
            .collect()
    }
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self::new(BookingRules::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2024-01-01 is a Monday
    fn monday_morning() -> NaiveDateTime {
        date(2024, 1, 1).and_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn horizon_boundary_is_inclusive() {
        let policy = BookingPolicy::default();
        assert_eq!(policy.validate_date(date(2024, 1, 8), monday_morning()), Ok(()));
        assert_eq!(
            policy.validate_date(date(2024, 1, 9), monday_morning()),
            Err(DateRejection::BeyondHorizon)
        );
    }

    #[test]
    fn today_is_bookable_but_yesterday_is_not() {
        let policy = BookingPolicy::default();
        assert_eq!(policy.validate_date(date(2024, 1, 1), monday_morning()), Ok(()));
        assert_eq!(
            policy.validate_date(date(2023, 12, 31), monday_morning()),
            Err(DateRejection::PastDate)
        );
    }

    #[test]
    fn sundays_are_rejected() {
        let policy = BookingPolicy::default();
        assert_eq!(
            policy.validate_date(date(2024, 1, 7), monday_morning()),
            Err(DateRejection::ClosedOnSunday)
        );
    }

    #[test]
    fn horizon_is_checked_before_the_weekday() {
        let policy = BookingPolicy::default();
        // 2024-01-14 is a Sunday beyond the horizon
        assert_eq!(
            policy.validate_date(date(2024, 1, 14), monday_morning()),
            Err(DateRejection::BeyondHorizon)
        );
    }

    #[test]
    fn lead_time_cutoff_adds_minimum_hours() {
        let policy = BookingPolicy::default();
        assert_eq!(
            policy.lead_time_cutoff(monday_morning()),
            date(2024, 1, 1).and_hms_opt(10, 0, 0).unwrap()
        );
    }

    #[test]
    fn oversized_rules_do_not_overflow() {
        let policy = BookingPolicy::new(BookingRules {
            max_advance_days: 1_000_000_000,
            min_advance_hours: i64::MAX,
            ..BookingRules::default()
        });

        assert_eq!(policy.validate_date(date(2030, 6, 4), monday_morning()), Ok(()));
        assert_eq!(policy.lead_time_cutoff(monday_morning()), NaiveDateTime::MAX);
    }

    #[test]
    fn upcoming_dates_skip_sundays() {
        let policy = BookingPolicy::default();
        let dates = policy.upcoming_bookable_dates(date(2024, 1, 1), 7);

        assert_eq!(dates.len(), 7);
        assert_eq!(dates.first(), Some(&date(2024, 1, 1)));
        assert!(!dates.contains(&date(2024, 1, 7)));
        assert_eq!(dates.last(), Some(&date(2024, 1, 8)));
    }

    #[test]
    fn rejection_becomes_invalid_date_error() {
        let err: AppointmentError = DateRejection::ClosedOnSunday.into();
        assert_eq!(err, AppointmentError::InvalidDate("closed on Sundays".to_string()));
    }
}
