//! Calendar arithmetic over canonical period starts.
//!
//! Every period is identified by the first day it covers. Weeks follow
//! ISO-8601: they start on Monday, and week 1 is the week holding the
//! year's first Thursday, so a week's week-year can differ from the
//! calendar year of some of its days.

use crate::models::Granularity;
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

pub fn start_of(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Daily => date,
        Granularity::Weekly => date
            .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
            .unwrap_or(NaiveDate::MIN),
        Granularity::Monthly => date.with_day(1).unwrap_or(date),
        Granularity::Quarterly => quarter_start(date.year(), quarter_of(date)).unwrap_or(date),
        Granularity::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
    }
}

pub fn end_of(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    let start = start_of(date, granularity);
    let following = next(start, granularity);
    if following == NaiveDate::MAX && start_of(NaiveDate::MAX, granularity) == start {
        return NaiveDate::MAX;
    }
    following.pred_opt().unwrap_or(start)
}

/// Steps one unit forward. Month arithmetic clamps the day of month
/// (Jan 31 -> Feb 28/29).
pub fn next(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    let stepped = match granularity {
        Granularity::Daily => date.checked_add_days(Days::new(1)),
        Granularity::Weekly => date.checked_add_days(Days::new(7)),
        Granularity::Monthly => date.checked_add_months(Months::new(1)),
        Granularity::Quarterly => date.checked_add_months(Months::new(3)),
        Granularity::Yearly => date.checked_add_months(Months::new(12)),
    };
    stepped.unwrap_or(NaiveDate::MAX)
}

pub fn previous(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    let stepped = match granularity {
        Granularity::Daily => date.checked_sub_days(Days::new(1)),
        Granularity::Weekly => date.checked_sub_days(Days::new(7)),
        Granularity::Monthly => date.checked_sub_months(Months::new(1)),
        Granularity::Quarterly => date.checked_sub_months(Months::new(3)),
        Granularity::Yearly => date.checked_sub_months(Months::new(12)),
    };
    stepped.unwrap_or(NaiveDate::MIN)
}

/// `[start_of, end_of]` of the period containing `date`.
pub fn bounds(date: NaiveDate, granularity: Granularity) -> (NaiveDate, NaiveDate) {
    (start_of(date, granularity), end_of(date, granularity))
}

/// Ascending canonical starts of every period lying inside
/// `[start_of(start), end_of(end)]`.
pub fn range_between(start: NaiveDate, end: NaiveDate, granularity: Granularity) -> Vec<NaiveDate> {
    let mut periods = Vec::new();
    let mut cursor = start_of(start, granularity);
    let last = start_of(end, granularity);
    while cursor <= last {
        periods.push(cursor);
        let following = next(cursor, granularity);
        if following <= cursor {
            break;
        }
        cursor = following;
    }
    periods
}

/// True when the period holding `candidate` intersects `[parent_start, parent_end]`.
///
/// A week running Dec 30 - Jan 5 overlaps both December and January, both
/// Q4 and Q1, and both calendar years.
pub fn periods_overlap(
    candidate: NaiveDate,
    granularity: Granularity,
    parent_start: NaiveDate,
    parent_end: NaiveDate,
) -> bool {
    let (start, end) = bounds(candidate, granularity);
    start <= parent_end && end >= parent_start
}

/// Same period iff the canonical starts agree.
pub fn same_period(a: NaiveDate, b: NaiveDate, granularity: Granularity) -> bool {
    start_of(a, granularity) == start_of(b, granularity)
}

pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

pub fn iso_week_year(date: NaiveDate) -> i32 {
    date.iso_week().year()
}

/// Monday of ISO week `week` in `week_year`.
pub fn iso_week_start(week_year: i32, week: u32) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(week_year, week, Weekday::Mon)
}

/// Quarter of the year, 1-indexed.
pub fn quarter_of(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}

pub fn quarter_start(year: i32, quarter: u32) -> Option<NaiveDate> {
    if !(1..=4).contains(&quarter) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)
}

/// First day of `month0` (0-indexed) in `year`.
pub fn month_start(year: i32, month0: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

pub fn year_start(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}

/// Short human label for a period, e.g. `2025-W01`, `2024-Q4`, `Dec 2024`.
pub fn label(date: NaiveDate, granularity: Granularity) -> String {
    let start = start_of(date, granularity);
    match granularity {
        Granularity::Daily => start.format("%Y-%m-%d %a").to_string(),
        Granularity::Weekly => format!("{}-W{:02}", iso_week_year(start), iso_week(start)),
        Granularity::Monthly => start.format("%b %Y").to_string(),
        Granularity::Quarterly => format!("{}-Q{}", start.year(), quarter_of(start)),
        Granularity::Yearly => start.year().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample_dates() -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut cursor = ymd(2023, 12, 20);
        while cursor <= ymd(2025, 1, 10) {
            dates.push(cursor);
            cursor = cursor + Days::new(3);
        }
        dates.extend([ymd(2024, 2, 29), ymd(2024, 12, 31), ymd(2020, 12, 31), ymd(2021, 1, 3)]);
        dates
    }

    #[test]
    fn start_and_end_bracket_date_and_start_is_idempotent() {
        for date in sample_dates() {
            for granularity in Granularity::ALL {
                let start = start_of(date, granularity);
                let end = end_of(date, granularity);
                assert!(start <= date && date <= end, "{date} {granularity}");
                assert_eq!(start_of(start, granularity), start);
                assert_eq!(start_of(end, granularity), start);
            }
        }
    }

    #[test]
    fn next_after_previous_lands_in_same_period() {
        for date in sample_dates() {
            for granularity in Granularity::ALL {
                let round_trip = next(previous(date, granularity), granularity);
                assert!(same_period(round_trip, date, granularity), "{date} {granularity}");
            }
        }
    }

    #[test]
    fn month_steps_clamp_day_of_month() {
        assert_eq!(next(ymd(2024, 1, 31), Granularity::Monthly), ymd(2024, 2, 29));
        assert_eq!(previous(ymd(2024, 3, 31), Granularity::Monthly), ymd(2024, 2, 29));
        assert_eq!(next(ymd(2024, 11, 30), Granularity::Quarterly), ymd(2025, 2, 28));
        assert_eq!(next(ymd(2024, 2, 29), Granularity::Yearly), ymd(2025, 2, 28));
    }

    #[test]
    fn canonical_boundaries() {
        let date = ymd(2024, 8, 15);
        assert_eq!(start_of(date, Granularity::Weekly), ymd(2024, 8, 12));
        assert_eq!(end_of(date, Granularity::Weekly), ymd(2024, 8, 18));
        assert_eq!(end_of(date, Granularity::Monthly), ymd(2024, 8, 31));
        assert_eq!(start_of(date, Granularity::Quarterly), ymd(2024, 7, 1));
        assert_eq!(end_of(date, Granularity::Quarterly), ymd(2024, 9, 30));
        assert_eq!(end_of(date, Granularity::Yearly), ymd(2024, 12, 31));
    }

    #[test]
    fn iso_week_year_diverges_from_calendar_year() {
        let date = ymd(2024, 12, 30);
        assert_eq!(iso_week(date), 1);
        assert_eq!(iso_week_year(date), 2025);
        assert_eq!(iso_week_start(2025, 1), Some(date));
        let late = ymd(2021, 1, 3);
        assert_eq!(iso_week(late), 53);
        assert_eq!(iso_week_year(late), 2020);
    }

    #[test]
    fn boundary_week_overlaps_both_neighbours() {
        let week = ymd(2025, 1, 2);
        assert!(periods_overlap(week, Granularity::Weekly, ymd(2024, 12, 1), ymd(2024, 12, 31)));
        assert!(periods_overlap(week, Granularity::Weekly, ymd(2025, 1, 1), ymd(2025, 1, 31)));
        assert!(!periods_overlap(week, Granularity::Weekly, ymd(2024, 11, 1), ymd(2024, 11, 30)));
        assert!(periods_overlap(week, Granularity::Weekly, ymd(2024, 10, 1), ymd(2024, 12, 31)));
        assert!(periods_overlap(week, Granularity::Weekly, ymd(2025, 1, 1), ymd(2025, 12, 31)));
    }

    #[test]
    fn range_between_enumerates_weeks_of_a_quarter() {
        let weeks = range_between(ymd(2024, 10, 1), ymd(2024, 12, 31), Granularity::Weekly);
        assert_eq!(weeks.first(), Some(&ymd(2024, 9, 30)));
        assert_eq!(weeks.last(), Some(&ymd(2024, 12, 30)));
        assert_eq!(weeks.len(), 14);
        assert!(weeks.windows(2).all(|pair| pair[0] < pair[1]));

        let days = range_between(ymd(2024, 2, 27), ymd(2024, 3, 2), Granularity::Daily);
        assert_eq!(days.len(), 5);
    }

    #[test]
    fn labels_are_readable() {
        assert_eq!(label(ymd(2024, 12, 31), Granularity::Weekly), "2025-W01");
        assert_eq!(label(ymd(2024, 11, 5), Granularity::Quarterly), "2024-Q4");
        assert_eq!(label(ymd(2024, 12, 5), Granularity::Monthly), "Dec 2024");
        assert_eq!(label(ymd(2024, 12, 5), Granularity::Yearly), "2024");
    }
}
