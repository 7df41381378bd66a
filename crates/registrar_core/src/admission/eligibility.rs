//! Age eligibility.
//!
//! Age is counted in whole years against an injectable "today" so callers
//! and tests agree on the reference date.

use crate::admission::AdmissionRejection;
use chrono::{Datelike, Local, NaiveDate};

/// Source of the current calendar date.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Whole years between `birth_date` and `today`.
///
/// Returns `None` when `birth_date` is after `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth_date > today {
        return None;
    }
    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Rejects applicants younger than `minimum_age` on `today`.
pub fn ensure_minimum_age(
    birth_date: NaiveDate,
    today: NaiveDate,
    minimum_age: u32,
) -> Result<u32, AdmissionRejection> {
    let age = age_on(birth_date, today).ok_or(AdmissionRejection::InvalidField {
        field: "birth_date",
        reason: "must not be in the future",
    })?;
    if age < minimum_age {
        return Err(AdmissionRejection::AgeIneligible { minimum_age });
    }
    Ok(age)
}

#[cfg(test)]
mod tests {
    use super::{age_on, ensure_minimum_age, Clock, FixedClock};
    use crate::admission::AdmissionRejection;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_drops_a_year_before_the_birthday() {
        assert_eq!(age_on(date(2006, 5, 20), date(2024, 5, 19)), Some(17));
        assert_eq!(age_on(date(2006, 5, 20), date(2024, 5, 20)), Some(18));
        assert_eq!(age_on(date(2006, 5, 20), date(2024, 12, 1)), Some(18));
        assert_eq!(age_on(date(2024, 5, 20), date(2024, 5, 20)), Some(0));
    }

    #[test]
    fn future_birth_date_has_no_age() {
        assert_eq!(age_on(date(2030, 1, 1), date(2024, 1, 1)), None);
        let err = ensure_minimum_age(date(2030, 1, 1), date(2024, 1, 1), 16).unwrap_err();
        assert_eq!(err.code(), "invalid_field");
    }

    #[test]
    fn leap_day_birthdays_count_from_march_first_in_common_years() {
        assert_eq!(age_on(date(2004, 2, 29), date(2022, 2, 28)), Some(17));
        assert_eq!(age_on(date(2004, 2, 29), date(2022, 3, 1)), Some(18));
    }

    #[test]
    fn minimum_age_boundary_is_inclusive() {
        let clock = FixedClock(date(2024, 6, 10));
        assert_eq!(
            ensure_minimum_age(date(2006, 6, 10), clock.today(), 18),
            Ok(18)
        );
        assert_eq!(
            ensure_minimum_age(date(2006, 6, 11), clock.today(), 18),
            Err(AdmissionRejection::AgeIneligible { minimum_age: 18 })
        );
    }
}
