//! Candidate periods per column.
//!
//! A column is narrowed by its nearest *visible* ancestor that has a
//! selection. Hidden ancestors never constrain, so hiding a column widens
//! the columns below it instead of emptying them.

use crate::context::SelectionContext;
use crate::models::Granularity;
use crate::period;
use chrono::{Datelike, Days, Months, NaiveDate};
use std::collections::BTreeSet;

pub type Visibility = BTreeSet<Granularity>;

const YEARS_BACK: i32 = 5;
const FALLBACK_MONTH_YEARS: i32 = 1;
const FALLBACK_WEEK_MONTHS: u32 = 3;
const FALLBACK_DAYS: u64 = 14;

/// The ancestor window a column is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Window {
        ancestor: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    },
    Unconstrained,
}

pub fn resolve_scope(granularity: Granularity, context: &SelectionContext, visible: &Visibility) -> Scope {
    for ancestor in granularity.ancestors() {
        if !visible.contains(ancestor) || !context.is_selected(*ancestor) {
            continue;
        }
        if let Some((start, end)) = context.selected_window(*ancestor) {
            return Scope::Window {
                ancestor: *ancestor,
                start,
                end,
            };
        }
    }
    Scope::Unconstrained
}

/// Ascending canonical starts of the periods to list for `granularity`.
pub fn generate(
    granularity: Granularity,
    context: &SelectionContext,
    visible: &Visibility,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    match (granularity, resolve_scope(granularity, context, visible)) {
        (Granularity::Yearly, _) => recent_years(today),
        (Granularity::Weekly, Scope::Window { start, end, .. }) => weeks_overlapping(start, end),
        (_, Scope::Window { start, end, .. }) => period::range_between(start, end, granularity),
        (Granularity::Quarterly, Scope::Unconstrained) => {
            let (first, last) = year_span(today, YEARS_BACK);
            period::range_between(first, last, Granularity::Quarterly)
        }
        (Granularity::Monthly, Scope::Unconstrained) => {
            let (first, last) = year_span(today, FALLBACK_MONTH_YEARS);
            period::range_between(first, last, Granularity::Monthly)
        }
        (Granularity::Weekly, Scope::Unconstrained) => {
            let first = today
                .checked_sub_months(Months::new(FALLBACK_WEEK_MONTHS))
                .unwrap_or(NaiveDate::MIN);
            weeks_overlapping(first, period::end_of(today, Granularity::Weekly))
        }
        (Granularity::Daily, Scope::Unconstrained) => {
            let first = today
                .checked_sub_days(Days::new(FALLBACK_DAYS - 1))
                .unwrap_or(NaiveDate::MIN);
            period::range_between(first, today, Granularity::Daily)
        }
    }
}

fn recent_years(today: NaiveDate) -> Vec<NaiveDate> {
    ((today.year() - YEARS_BACK)..=today.year())
        .filter_map(period::year_start)
        .collect()
}

fn year_span(today: NaiveDate, years_back: i32) -> (NaiveDate, NaiveDate) {
    let first = period::year_start(today.year() - years_back).unwrap_or(today);
    (first, period::end_of(today, Granularity::Yearly))
}

fn weeks_overlapping(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    period::range_between(start, end, Granularity::Weekly)
        .into_iter()
        .filter(|week| period::periods_overlap(*week, Granularity::Weekly, start, end))
        .collect()
}
