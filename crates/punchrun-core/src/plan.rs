//! Business-day planning for the current month.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::date::RocDate;

/// Enumerate every day from the first of `today`'s month through `today`
/// inclusive, keeping weekdays (Mon-Fri) whose era-based form is not in the
/// holiday set. Output is chronological.
pub fn plan_business_days(today: NaiveDate, holidays: &BTreeSet<RocDate>) -> Vec<RocDate> {
    let first = match today.with_day(1) {
        Some(first) => first,
        None => return Vec::new(),
    };
    first
        .iter_days()
        .take_while(|day| *day <= today)
        .filter(|day| day.weekday().num_days_from_monday() < 5)
        .map(RocDate::from_gregorian)
        .filter(|day| !holidays.contains(day))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn keeps_only_weekdays_up_to_today() {
        // 2026-01-05 is a Monday; Jan 1 Thu, Jan 2 Fri, Jan 3/4 weekend.
        let candidates = plan_business_days(date(2026, 1, 5), &BTreeSet::new());
        assert_eq!(
            candidates,
            vec![
                RocDate::new(115, 1, 1),
                RocDate::new(115, 1, 2),
                RocDate::new(115, 1, 5),
            ]
        );
    }

    #[test]
    fn excludes_holidays() {
        let holidays = BTreeSet::from([RocDate::new(115, 1, 1)]);
        let candidates = plan_business_days(date(2026, 1, 5), &holidays);
        assert_eq!(
            candidates,
            vec![RocDate::new(115, 1, 2), RocDate::new(115, 1, 5)]
        );
    }

    #[test]
    fn output_never_intersects_holiday_set() {
        let holidays = BTreeSet::from([
            RocDate::new(115, 1, 1),
            RocDate::new(115, 1, 2),
            RocDate::new(115, 1, 20),
        ]);
        let candidates = plan_business_days(date(2026, 1, 30), &holidays);
        assert!(candidates.iter().all(|day| !holidays.contains(day)));
    }

    #[test]
    fn weekend_today_yields_weekdays_only() {
        // 2026-01-04 is a Sunday.
        let candidates = plan_business_days(date(2026, 1, 4), &BTreeSet::new());
        assert_eq!(
            candidates,
            vec![RocDate::new(115, 1, 1), RocDate::new(115, 1, 2)]
        );
    }

    #[test]
    fn first_of_month_on_a_weekday_yields_one_candidate() {
        // 2026-01-01 is a Thursday.
        let candidates = plan_business_days(date(2026, 1, 1), &BTreeSet::new());
        assert_eq!(candidates, vec![RocDate::new(115, 1, 1)]);
    }
}
