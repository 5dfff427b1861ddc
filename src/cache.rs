//! Memoization in front of the generator and the entry filter.
//!
//! Three independent layers:
//! - decoded dates, one per live document (entries die with the document);
//! - documents per granularity, valid for one data version;
//! - generated periods per granularity, valid for one context key.

use crate::context::SelectionContext;
use crate::date_format;
use crate::filter::{self, MatchedDocument};
use crate::generator::{self, Visibility};
use crate::models::{Document, DocumentRef, DocumentSet, Granularity};
use crate::settings::FormatSet;
use chrono::NaiveDate;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub date_hits: u64,
    pub date_misses: u64,
    pub entry_hits: u64,
    pub entry_misses: u64,
    pub period_hits: u64,
    pub period_generations: u64,
}

#[derive(Debug)]
struct DateMemo {
    document: Weak<Document>,
    granularity: Granularity,
    date: Option<NaiveDate>,
}

#[derive(Debug, Default)]
pub struct PeriodCache {
    dates: HashMap<usize, DateMemo>,
    entries_version: Option<u64>,
    entries: HashMap<Granularity, Vec<DocumentRef>>,
    periods_key: Option<u64>,
    periods: HashMap<Granularity, Vec<NaiveDate>>,
    stats: CacheStats,
}

impl PeriodCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Date decoded from the document's name under `granularity`'s format.
    pub fn date_of(
        &mut self,
        document: &DocumentRef,
        granularity: Granularity,
        formats: &FormatSet,
    ) -> Option<NaiveDate> {
        let key = Arc::as_ptr(document) as usize;
        if let Some(memo) = self.dates.get(&key) {
            // The weak handle pins the allocation, so a live memo at this
            // address is this document.
            if memo.document.strong_count() > 0 && memo.granularity == granularity {
                self.stats.date_hits += 1;
                return memo.date;
            }
        }

        self.stats.date_misses += 1;
        let date = match (formats.format(granularity), formats.folder(granularity)) {
            (Some(format), Some(folder)) => date_format::extract_date(document, folder, format),
            _ => None,
        };
        self.dates.insert(
            key,
            DateMemo {
                document: Arc::downgrade(document),
                granularity,
                date,
            },
        );
        date
    }

    /// Documents owned by `granularity` in `set`, cached per data version.
    pub fn entries_of_type(
        &mut self,
        granularity: Granularity,
        set: &DocumentSet,
        formats: &FormatSet,
    ) -> Vec<DocumentRef> {
        if self.entries_version != Some(set.version) {
            tracing::debug!(
                previous = ?self.entries_version,
                version = set.version,
                "document set changed; dropping per-type entries"
            );
            self.entries.clear();
            self.dates.retain(|_, memo| memo.document.strong_count() > 0);
            self.entries_version = Some(set.version);
        }

        if let Some(entries) = self.entries.get(&granularity) {
            self.stats.entry_hits += 1;
            return entries.clone();
        }

        self.stats.entry_misses += 1;
        let entries: Vec<DocumentRef> = set
            .documents
            .iter()
            .filter(|document| formats.owner(document) == Some(granularity))
            .cloned()
            .collect();
        tracing::debug!(granularity = %granularity, count = entries.len(), "indexed documents by type");
        self.entries.insert(granularity, entries.clone());
        entries
    }

    /// Generated periods for `granularity`; callers get their own copy.
    pub fn periods(
        &mut self,
        granularity: Granularity,
        context: &SelectionContext,
        visible: &Visibility,
        today: NaiveDate,
    ) -> Vec<NaiveDate> {
        let key = context_key(context, visible, today);
        if self.periods_key != Some(key) {
            self.periods.clear();
            self.periods_key = Some(key);
        }

        if let Some(periods) = self.periods.get(&granularity) {
            self.stats.period_hits += 1;
            return periods.clone();
        }

        self.stats.period_generations += 1;
        let periods = generator::generate(granularity, context, visible, today);
        tracing::debug!(granularity = %granularity, key, count = periods.len(), "generated periods");
        self.periods.insert(granularity, periods.clone());
        periods
    }

    /// Documents of `granularity` that belong to the current context.
    pub fn matching(
        &mut self,
        granularity: Granularity,
        set: &DocumentSet,
        formats: &FormatSet,
        context: &SelectionContext,
        visible: &Visibility,
    ) -> Vec<MatchedDocument> {
        let entries = self.entries_of_type(granularity, set, formats);
        filter::filter(&entries, granularity, context, visible, |document| {
            self.date_of(document, granularity, formats)
        })
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.entries_version = None;
        self.periods.clear();
        self.periods_key = None;
        self.dates.clear();
    }
}

/// Hash of the selection fields, the sorted visible set and the day the
/// lists were generated for.
pub fn context_key(context: &SelectionContext, visible: &Visibility, today: NaiveDate) -> u64 {
    debug_assert_eq!(
        context.selected_week().is_some(),
        context.selected_week_year().is_some(),
        "week and week-year must be set together"
    );
    let mut hasher = DefaultHasher::new();
    context.selected_year().hash(&mut hasher);
    context.selected_quarter().hash(&mut hasher);
    context.selected_month().hash(&mut hasher);
    context.selected_week().hash(&mut hasher);
    context.selected_week_year().hash(&mut hasher);
    for granularity in visible {
        granularity.hash(&mut hasher);
    }
    today.hash(&mut hasher);
    hasher.finish()
}
