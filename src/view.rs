//! The navigator itself: one selection context, one cache and the current
//! document snapshot, turned into columns of period items.

use crate::cache::{CacheStats, PeriodCache};
use crate::context::SelectionContext;
use crate::errors::{NavError, NavResult};
use crate::generator::{resolve_scope, Scope, Visibility};
use crate::models::{
    BlockReason, ColumnState, CreateRequest, Document, DocumentRef, DocumentSet, Granularity, PeriodItem,
};
use crate::period;
use crate::settings::{FormatSet, NavigatorSettings};
use crate::vault::DocumentCreator;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub struct PeriodView {
    settings: NavigatorSettings,
    formats: FormatSet,
    documents: DocumentSet,
    context: SelectionContext,
    cache: PeriodCache,
    hidden: BTreeSet<Granularity>,
    done: HashSet<String>,
    today: NaiveDate,
}

impl PeriodView {
    pub fn new(settings: NavigatorSettings, documents: DocumentSet, today: NaiveDate) -> NavResult<Self> {
        settings.validate()?;
        let formats = FormatSet::new(&settings)?;
        let mut view = Self {
            settings,
            formats,
            documents,
            context: SelectionContext::for_today(today),
            cache: PeriodCache::new(),
            hidden: BTreeSet::new(),
            done: HashSet::new(),
            today,
        };
        view.recompute_exists();
        Ok(view)
    }

    pub fn settings(&self) -> &NavigatorSettings {
        &self.settings
    }

    pub fn context(&self) -> &SelectionContext {
        &self.context
    }

    pub fn documents(&self) -> &DocumentSet {
        &self.documents
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Enabled granularities whose column is not hidden.
    pub fn visible_granularities(&self) -> Visibility {
        self.settings
            .enabled()
            .filter(|granularity| !self.hidden.contains(granularity))
            .collect()
    }

    pub fn set_column_visible(&mut self, granularity: Granularity, visible: bool) {
        if visible {
            self.hidden.remove(&granularity);
        } else {
            self.hidden.insert(granularity);
        }
    }

    /// Start of the highlighted period in `granularity`'s column.
    pub fn selected_period(&self, granularity: Granularity) -> Option<NaiveDate> {
        self.context.selected_start(granularity)
    }

    /// Every visible column, largest granularity first.
    pub fn columns(&mut self) -> Vec<ColumnState> {
        let visible = self.visible_granularities();
        visible
            .iter()
            .rev()
            .map(|granularity| self.column_with(*granularity, &visible))
            .collect()
    }

    pub fn column(&mut self, granularity: Granularity) -> ColumnState {
        let visible = self.visible_granularities();
        self.column_with(granularity, &visible)
    }

    fn column_with(&mut self, granularity: Granularity, visible: &Visibility) -> ColumnState {
        if let Some(reason) = self.block_reason(granularity, visible) {
            tracing::debug!(granularity = %granularity, reason = ?reason, "column blocked");
            return ColumnState::Blocked {
                granularity,
                reason,
                message: reason.message(),
            };
        }

        let periods = self.cache.periods(granularity, &self.context, visible, self.today);
        let matched = self
            .cache
            .matching(granularity, &self.documents, &self.formats, &self.context, visible);

        let mut by_start: BTreeMap<NaiveDate, DocumentRef> = BTreeMap::new();
        for entry in matched {
            by_start
                .entry(period::start_of(entry.date, granularity))
                .or_insert(entry.document);
        }
        let starts: BTreeSet<NaiveDate> = periods.into_iter().chain(by_start.keys().copied()).collect();

        let items: Vec<PeriodItem> = starts
            .into_iter()
            .rev()
            .map(|start| {
                let document = by_start.get(&start).cloned();
                let done = document
                    .as_ref()
                    .map(|document| self.done.contains(&document.path))
                    .unwrap_or(false);
                PeriodItem {
                    date: start,
                    granularity,
                    label: period::label(start, granularity),
                    missing: document.is_none(),
                    current: period::same_period(start, self.today, granularity),
                    done,
                    document,
                }
            })
            .collect();
        tracing::debug!(granularity = %granularity, count = items.len(), "built column");
        ColumnState::Items { granularity, items }
    }

    fn block_reason(&self, granularity: Granularity, visible: &Visibility) -> Option<BlockReason> {
        if self.settings.require_parent_selection {
            let nearest = granularity
                .ancestors()
                .iter()
                .find(|ancestor| visible.contains(*ancestor));
            if let Some(parent) = nearest {
                if !self.context.is_selected(*parent) {
                    return Some(BlockReason::ParentNotSelected(*parent));
                }
            }
        }
        if self.settings.require_parent_document {
            if let Scope::Window { ancestor, .. } = resolve_scope(granularity, &self.context, visible) {
                if !self.context.exists(ancestor) {
                    return Some(BlockReason::ParentMissing(ancestor));
                }
            }
        }
        None
    }

    /// Click on the period of `granularity` containing `date`.
    ///
    /// Smaller selections are cleared. Larger ones are walked from the year
    /// down: a previous selection that still overlaps the clicked period is
    /// kept, anything else is re-derived from the part of the clicked period
    /// inside the kept parents. A week spanning New Year therefore stays in
    /// whichever year the user reached it from.
    pub fn select(&mut self, granularity: Granularity, date: NaiveDate) {
        let previous = self.context.clone();
        let (clicked_start, clicked_end) = period::bounds(date, granularity);
        let exists = self.has_document(granularity, clicked_start);
        self.context.select_at(granularity, date, exists);

        let mut anchor = clicked_start;
        for ancestor in granularity.ancestors().iter().rev().copied() {
            match previous.selected_window(ancestor) {
                Some((start, end)) if start <= clicked_end && end >= anchor => {
                    self.cascade(ancestor, start, previous.exists(ancestor));
                    anchor = anchor.max(start);
                }
                _ => {
                    let exists = self.has_document(ancestor, anchor);
                    self.cascade(ancestor, anchor, exists);
                }
            }
        }
        tracing::debug!(granularity = %granularity, date = %clicked_start, exists, "selected period");
    }

    // The week is applied last, so it must not re-derive the larger fields.
    fn cascade(&mut self, ancestor: Granularity, date: NaiveDate, exists: bool) {
        match ancestor {
            Granularity::Weekly => self.context.select_week_within(date, exists),
            _ => self.context.select_ancestor(ancestor, date, exists),
        }
    }

    /// Swaps in a fresh document snapshot, keeping the user's place.
    pub fn refresh(&mut self, documents: DocumentSet) {
        let snapshot = self.context.snapshot();
        let version = self.next_version(documents.version);
        self.documents = DocumentSet::new(version, documents.documents);
        self.context.restore(&snapshot);
        self.recompute_exists();
        tracing::info!(version, count = self.documents.documents.len(), "refreshed documents");
    }

    /// Creates the note for the period containing `date` and selects it.
    pub fn create<C: DocumentCreator>(
        &mut self,
        granularity: Granularity,
        date: NaiveDate,
        creator: &mut C,
    ) -> NavResult<DocumentRef> {
        let start = period::start_of(date, granularity);
        let Some(path) = self.formats.path_for(granularity, start) else {
            return Err(NavError::Create(format!("{} periods are disabled", granularity)));
        };
        if let Some(existing) = self.find_document(granularity, start) {
            return Err(NavError::Create(format!("{} already exists", existing.path)));
        }

        let request = CreateRequest {
            granularity,
            date: start,
            path,
            template_path: self.settings.period(granularity).template_path.clone(),
        };
        let document = creator.create(&request)?;

        let mut documents = self.documents.documents.clone();
        documents.push(document.clone());
        let version = self.next_version(self.documents.version);
        self.documents = DocumentSet::new(version, documents);
        self.select(granularity, start);
        Ok(document)
    }

    pub fn set_done(&mut self, document: &Document, done: bool) {
        if done {
            self.done.insert(document.path.clone());
        } else {
            self.done.remove(&document.path);
        }
    }

    pub fn is_done(&self, document: &Document) -> bool {
        self.done.contains(&document.path)
    }

    /// Versions only move forward, so a source restarting its counter, or a
    /// local creation racing a rescan, still invalidates cached entries.
    fn next_version(&self, incoming: u64) -> u64 {
        incoming.max(self.documents.version.saturating_add(1))
    }

    fn recompute_exists(&mut self) {
        for granularity in [
            Granularity::Yearly,
            Granularity::Quarterly,
            Granularity::Monthly,
            Granularity::Weekly,
        ] {
            if let Some(start) = self.context.selected_start(granularity) {
                let exists = self.has_document(granularity, start);
                self.context.set_exists(granularity, exists);
            }
        }
    }

    fn has_document(&mut self, granularity: Granularity, date: NaiveDate) -> bool {
        self.find_document(granularity, date).is_some()
    }

    fn find_document(&mut self, granularity: Granularity, date: NaiveDate) -> Option<DocumentRef> {
        let target = period::start_of(date, granularity);
        let entries = self.cache.entries_of_type(granularity, &self.documents, &self.formats);
        entries.into_iter().find(|document| {
            self.cache
                .date_of(document, granularity, &self.formats)
                .map(|found| period::start_of(found, granularity))
                == Some(target)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn view_with(paths: &[&str], today: NaiveDate) -> PeriodView {
        PeriodView::new(
            NavigatorSettings::default(),
            DocumentSet::from_paths(1, paths.iter().copied()),
            today,
        )
        .expect("view")
    }

    fn dates(column: &ColumnState) -> Vec<NaiveDate> {
        column.items().iter().map(|item| item.date).collect()
    }

    #[derive(Default)]
    struct MemoryCreator {
        requests: Vec<CreateRequest>,
    }

    impl DocumentCreator for MemoryCreator {
        fn create(&mut self, request: &CreateRequest) -> NavResult<DocumentRef> {
            self.requests.push(request.clone());
            Ok(Arc::new(Document::new(request.path.clone())))
        }
    }

    #[test]
    fn columns_are_listed_largest_first() {
        let mut view = view_with(&["2024.md"], ymd(2024, 1, 10));
        let order: Vec<Granularity> = view.columns().iter().map(ColumnState::granularity).collect();
        assert_eq!(
            order,
            vec![
                Granularity::Yearly,
                Granularity::Quarterly,
                Granularity::Monthly,
                Granularity::Weekly,
                Granularity::Daily
            ]
        );
    }

    #[test]
    fn quarters_of_selected_year_newest_first() {
        let mut view = view_with(&["2024.md", "2024-Q1.md"], ymd(2024, 1, 10));
        let column = view.column(Granularity::Quarterly);
        assert_eq!(
            dates(&column),
            vec![ymd(2024, 10, 1), ymd(2024, 7, 1), ymd(2024, 4, 1), ymd(2024, 1, 1)]
        );
        let first_quarter = &column.items()[3];
        assert!(!first_quarter.missing);
        assert!(first_quarter.current);
        assert_eq!(first_quarter.label, "2024-Q1");
        assert!(column.items()[0].missing);
    }

    #[test]
    fn missing_parent_note_blocks_children() {
        let mut view = view_with(&[], ymd(2024, 1, 10));
        let column = view.column(Granularity::Quarterly);
        match column {
            ColumnState::Blocked { reason, message, .. } => {
                assert_eq!(reason, BlockReason::ParentMissing(Granularity::Yearly));
                assert_eq!(message, "Create the yearly period first.");
            }
            other => panic!("expected blocked column, got {other:?}"),
        }
        assert!(!view.column(Granularity::Yearly).is_blocked());
    }

    #[test]
    fn unselected_parent_blocks_when_required() {
        let settings = NavigatorSettings::default()
            .merged(json!({ "requireParentSelection": true, "requireParentDocument": false }))
            .expect("settings");
        let mut view = PeriodView::new(settings, DocumentSet::default(), ymd(2024, 1, 10)).expect("view");
        let column = view.column(Granularity::Monthly);
        assert!(matches!(
            column,
            ColumnState::Blocked {
                reason: BlockReason::ParentNotSelected(Granularity::Quarterly),
                ..
            }
        ));
        view.select(Granularity::Quarterly, ymd(2024, 4, 1));
        assert_eq!(view.column(Granularity::Monthly).items().len(), 3);
    }

    #[test]
    fn selecting_a_day_fills_in_every_ancestor() {
        let mut view = view_with(
            &["2024.md", "2024-Q1.md", "2024-01.md", "2024-W02.md", "2024-01-08.md"],
            ymd(2024, 1, 10),
        );
        view.select(Granularity::Daily, ymd(2024, 1, 8));
        let context = view.context();
        assert_eq!(context.selected_quarter(), Some(1));
        assert_eq!(context.selected_month(), Some(0));
        assert_eq!(context.selected_week(), Some(2));
        assert_eq!(context.selected_week_year(), Some(2024));
        assert!(context.exists(Granularity::Quarterly));
        assert!(context.exists(Granularity::Monthly));
        assert!(context.exists(Granularity::Weekly));

        let days = view.column(Granularity::Daily);
        assert_eq!(days.items().len(), 7);
        assert_eq!(days.items()[6].date, ymd(2024, 1, 8));
        assert!(!days.items()[6].missing);
    }

    #[test]
    fn boundary_week_keeps_the_year_it_was_reached_from() {
        let paths = ["2024.md", "2024-Q4.md", "2024-12.md", "2025.md"];

        let mut december = view_with(&paths, ymd(2024, 12, 20));
        december.select(Granularity::Monthly, ymd(2024, 12, 1));
        december.select(Granularity::Weekly, ymd(2024, 12, 30));
        let context = december.context();
        assert_eq!(context.selected_year(), 2024);
        assert_eq!(context.selected_quarter(), Some(4));
        assert_eq!(context.selected_month(), Some(11));
        assert_eq!(context.selected_week(), Some(1));
        assert_eq!(context.selected_week_year(), Some(2025));
        assert!(dates(&december.column(Granularity::Weekly)).contains(&ymd(2024, 12, 30)));

        let mut january = view_with(&paths, ymd(2025, 1, 10));
        january.select(Granularity::Weekly, ymd(2024, 12, 30));
        let context = january.context();
        assert_eq!(context.selected_year(), 2025);
        assert_eq!(context.selected_quarter(), Some(1));
        assert_eq!(context.selected_month(), Some(0));
        assert_eq!(context.selected_week(), Some(1));
        assert!(context.exists(Granularity::Yearly));
        assert!(!context.exists(Granularity::Monthly));
    }

    #[test]
    fn clicking_a_new_year_day_keeps_the_year_of_the_day() {
        let mut view = view_with(&["2024.md", "2025.md", "2025-W01.md"], ymd(2025, 1, 10));
        view.select(Granularity::Daily, ymd(2025, 1, 2));
        let context = view.context();
        assert_eq!(context.selected_year(), 2025);
        assert_eq!(context.selected_quarter(), Some(1));
        assert_eq!(context.selected_month(), Some(0));
        assert_eq!(context.selected_week(), Some(1));
        assert_eq!(context.selected_week_year(), Some(2025));
        assert!(context.exists(Granularity::Yearly));
        assert!(context.exists(Granularity::Weekly));
        assert_eq!(dates(&view.column(Granularity::Daily)).len(), 7);
    }

    #[test]
    fn clicking_days_under_a_boundary_week_keeps_or_moves_the_year() {
        let paths = ["2024.md", "2024-Q4.md", "2024-12.md", "2025.md"];
        let mut view = view_with(&paths, ymd(2024, 12, 20));
        view.select(Granularity::Monthly, ymd(2024, 12, 1));
        view.select(Granularity::Weekly, ymd(2024, 12, 30));

        view.select(Granularity::Daily, ymd(2024, 12, 31));
        let context = view.context();
        assert_eq!(context.selected_year(), 2024);
        assert_eq!(context.selected_quarter(), Some(4));
        assert_eq!(context.selected_month(), Some(11));
        assert_eq!(context.selected_week(), Some(1));
        assert_eq!(context.selected_week_year(), Some(2025));
        assert!(context.exists(Granularity::Monthly));

        view.select(Granularity::Daily, ymd(2025, 1, 2));
        let context = view.context();
        assert_eq!(context.selected_year(), 2025);
        assert_eq!(context.selected_quarter(), Some(1));
        assert_eq!(context.selected_month(), Some(0));
        assert_eq!(context.selected_week(), Some(1));
        assert_eq!(context.selected_week_year(), Some(2025));
        assert!(context.exists(Granularity::Yearly));
        assert!(!context.exists(Granularity::Monthly));

        view.select(Granularity::Daily, ymd(2024, 12, 30));
        let context = view.context();
        assert_eq!(context.selected_year(), 2024);
        assert_eq!(context.selected_quarter(), Some(4));
        assert_eq!(context.selected_month(), Some(11));
        assert_eq!(context.selected_week(), Some(1));
        assert!(context.exists(Granularity::Quarterly));
    }

    #[test]
    fn hiding_a_column_widens_the_ones_below() {
        let mut view = view_with(&["2024.md", "2024-Q2.md"], ymd(2024, 1, 10));
        view.select(Granularity::Quarterly, ymd(2024, 4, 1));
        assert_eq!(view.column(Granularity::Monthly).items().len(), 3);

        view.set_column_visible(Granularity::Quarterly, false);
        assert_eq!(view.column(Granularity::Monthly).items().len(), 12);
        assert!(!view.visible_granularities().contains(&Granularity::Quarterly));
    }

    #[test]
    fn unconstrained_days_include_older_documents() {
        let mut view = view_with(&["2023-05-05.md"], ymd(2024, 1, 10));
        for granularity in [
            Granularity::Yearly,
            Granularity::Quarterly,
            Granularity::Monthly,
            Granularity::Weekly,
        ] {
            view.set_column_visible(granularity, false);
        }
        let days = view.column(Granularity::Daily);
        assert_eq!(days.items().len(), 15);
        assert_eq!(days.items()[0].date, ymd(2024, 1, 10));
        assert!(days.items()[0].current);
        let oldest = &days.items()[14];
        assert_eq!(oldest.date, ymd(2023, 5, 5));
        assert!(!oldest.missing);
    }

    #[test]
    fn refresh_keeps_selection_and_updates_existence() {
        let mut view = view_with(&["2024.md"], ymd(2024, 1, 10));
        view.select(Granularity::Monthly, ymd(2024, 3, 1));
        assert!(!view.context().exists(Granularity::Monthly));

        assert!(view.column(Granularity::Monthly).is_blocked());

        view.refresh(DocumentSet::from_paths(1, ["2024.md", "2024-Q1.md", "2024-03.md"]));
        assert_eq!(view.context().selected_month(), Some(2));
        assert!(view.context().exists(Granularity::Quarterly));
        assert!(view.context().exists(Granularity::Monthly));
        assert_eq!(view.documents().version, 2);
        assert!(!view.column(Granularity::Monthly).items()[0].missing);
    }

    #[test]
    fn create_selects_the_new_period() {
        let mut view = view_with(&["2024.md"], ymd(2024, 1, 10));
        let mut creator = MemoryCreator::default();
        let document = view
            .create(Granularity::Monthly, ymd(2024, 2, 15), &mut creator)
            .expect("create");
        assert_eq!(document.path, "2024-02.md");
        assert_eq!(creator.requests[0].date, ymd(2024, 2, 1));
        assert_eq!(view.context().selected_month(), Some(1));
        assert!(view.context().exists(Granularity::Monthly));

        let error = view
            .create(Granularity::Monthly, ymd(2024, 2, 3), &mut creator)
            .expect_err("duplicate");
        assert!(error.to_string().starts_with("CREATE_FAILED"));
        assert_eq!(creator.requests.len(), 1);
    }

    #[test]
    fn done_flags_follow_documents() {
        let mut view = view_with(&["2024.md", "2024-Q1.md"], ymd(2024, 1, 10));
        let document = Document::new("2024-Q1.md");
        view.set_done(&document, true);
        assert!(view.is_done(&document));
        let column = view.column(Granularity::Quarterly);
        assert!(column.items()[3].done);
        assert!(!column.items()[2].done);
    }
}
