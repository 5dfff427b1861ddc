use crate::models::Granularity;
use crate::period;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Whether the selected period of each granularity has a backing note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistsFlags {
    pub yearly: bool,
    pub quarterly: bool,
    pub monthly: bool,
    pub weekly: bool,
}

/// Plain copy of a [`SelectionContext`], used to carry the user's place
/// across a rebuild of the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub selected_year: i32,
    pub selected_quarter: Option<u32>,
    pub selected_month: Option<u32>,
    pub selected_week: Option<u32>,
    pub selected_week_year: Option<i32>,
    pub exists: ExistsFlags,
}

/// Hierarchical selection state of one open view.
///
/// Quarters are 1-indexed, months are 0-indexed, weeks are ISO week numbers.
/// The year is always set. The week-year is tracked apart from the calendar
/// year because the two diverge around New Year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionContext {
    selected_year: i32,
    selected_quarter: Option<u32>,
    selected_month: Option<u32>,
    selected_week: Option<u32>,
    selected_week_year: Option<i32>,
    exists: ExistsFlags,
}

impl SelectionContext {
    pub fn new(year: i32) -> Self {
        Self {
            selected_year: year,
            selected_quarter: None,
            selected_month: None,
            selected_week: None,
            selected_week_year: None,
            exists: ExistsFlags::default(),
        }
    }

    pub fn for_today(today: NaiveDate) -> Self {
        Self::new(today.year())
    }

    pub fn selected_year(&self) -> i32 {
        self.selected_year
    }

    pub fn selected_quarter(&self) -> Option<u32> {
        self.selected_quarter
    }

    pub fn selected_month(&self) -> Option<u32> {
        self.selected_month
    }

    pub fn selected_week(&self) -> Option<u32> {
        self.selected_week
    }

    pub fn selected_week_year(&self) -> Option<i32> {
        self.selected_week_year
    }

    /// Click transition: the clicked period becomes authoritative and every
    /// smaller granularity is cleared.
    pub fn select_at(&mut self, granularity: Granularity, date: NaiveDate, exists: bool) {
        self.apply(granularity, date, exists);
        for descendant in granularity.descendants() {
            self.clear(*descendant);
        }
    }

    /// Cascade transition: same derivation as [`Self::select_at`] but keeps
    /// the more specific selections.
    pub fn select_ancestor(&mut self, granularity: Granularity, date: NaiveDate, exists: bool) {
        self.apply(granularity, date, exists);
    }

    /// Cascade transition for the week alone: week and week-year follow the
    /// Monday of `date`, year, quarter and month stay as they are.
    pub fn select_week_within(&mut self, date: NaiveDate, exists: bool) {
        let monday = period::start_of(date, Granularity::Weekly);
        self.selected_week = Some(period::iso_week(monday));
        self.selected_week_year = Some(period::iso_week_year(monday));
        self.set_exists(Granularity::Weekly, exists);
    }

    fn apply(&mut self, granularity: Granularity, date: NaiveDate, exists: bool) {
        match granularity {
            Granularity::Daily => {}
            Granularity::Weekly => {
                let monday = period::start_of(date, Granularity::Weekly);
                self.selected_year = monday.year();
                self.selected_quarter = Some(period::quarter_of(monday));
                self.selected_month = Some(monday.month0());
                self.selected_week = Some(period::iso_week(monday));
                self.selected_week_year = Some(period::iso_week_year(monday));
            }
            Granularity::Monthly => {
                self.selected_year = date.year();
                self.selected_quarter = Some(period::quarter_of(date));
                self.selected_month = Some(date.month0());
            }
            Granularity::Quarterly => {
                self.selected_year = date.year();
                self.selected_quarter = Some(period::quarter_of(date));
            }
            Granularity::Yearly => {
                self.selected_year = date.year();
            }
        }
        self.set_exists(granularity, exists);
    }

    fn clear(&mut self, granularity: Granularity) {
        match granularity {
            Granularity::Daily | Granularity::Yearly => {}
            Granularity::Weekly => {
                self.selected_week = None;
                self.selected_week_year = None;
            }
            Granularity::Monthly => self.selected_month = None,
            Granularity::Quarterly => self.selected_quarter = None,
        }
        self.set_exists(granularity, false);
    }

    pub fn exists(&self, granularity: Granularity) -> bool {
        match granularity {
            Granularity::Daily => true,
            Granularity::Weekly => self.exists.weekly,
            Granularity::Monthly => self.exists.monthly,
            Granularity::Quarterly => self.exists.quarterly,
            Granularity::Yearly => self.exists.yearly,
        }
    }

    pub fn set_exists(&mut self, granularity: Granularity, exists: bool) {
        match granularity {
            Granularity::Daily => {}
            Granularity::Weekly => self.exists.weekly = exists,
            Granularity::Monthly => self.exists.monthly = exists,
            Granularity::Quarterly => self.exists.quarterly = exists,
            Granularity::Yearly => self.exists.yearly = exists,
        }
    }

    /// True once the user has drilled below the default year-only state.
    pub fn has_selection(&self) -> bool {
        self.selected_quarter.is_some() || self.selected_month.is_some() || self.selected_week.is_some()
    }

    /// Whether `granularity` currently has an active selection. The year
    /// always does; days are never stored.
    pub fn is_selected(&self, granularity: Granularity) -> bool {
        match granularity {
            Granularity::Daily => false,
            Granularity::Weekly => self.selected_week.is_some(),
            Granularity::Monthly => self.selected_month.is_some(),
            Granularity::Quarterly => self.selected_quarter.is_some(),
            Granularity::Yearly => true,
        }
    }

    /// Canonical start of the selected period at `granularity`, if any.
    pub fn selected_start(&self, granularity: Granularity) -> Option<NaiveDate> {
        match granularity {
            Granularity::Daily => None,
            Granularity::Weekly => period::iso_week_start(self.selected_week_year?, self.selected_week?),
            Granularity::Monthly => period::month_start(self.selected_year, self.selected_month?),
            Granularity::Quarterly => period::quarter_start(self.selected_year, self.selected_quarter?),
            Granularity::Yearly => period::year_start(self.selected_year),
        }
    }

    /// `[start, end]` window of the selected period at `granularity`.
    pub fn selected_window(&self, granularity: Granularity) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.selected_start(granularity)?;
        Some(period::bounds(start, granularity))
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            selected_year: self.selected_year,
            selected_quarter: self.selected_quarter,
            selected_month: self.selected_month,
            selected_week: self.selected_week,
            selected_week_year: self.selected_week_year,
            exists: self.exists,
        }
    }

    pub fn restore(&mut self, snapshot: &ContextSnapshot) {
        self.selected_year = snapshot.selected_year;
        self.selected_quarter = snapshot.selected_quarter.filter(|q| (1..=4).contains(q));
        self.selected_month = snapshot.selected_month.filter(|m| *m < 12);
        match (snapshot.selected_week, snapshot.selected_week_year) {
            (Some(week), Some(week_year)) => {
                self.selected_week = Some(week);
                self.selected_week_year = Some(week_year);
            }
            _ => {
                self.selected_week = None;
                self.selected_week_year = None;
            }
        }
        self.exists = snapshot.exists;
    }
}
