use crate::context::SelectionContext;
use crate::generator::{resolve_scope, Scope, Visibility};
use crate::models::{DocumentRef, Granularity};
use crate::period;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct MatchedDocument {
    pub document: DocumentRef,
    pub date: NaiveDate,
}

/// Documents of `granularity` belonging to the current context.
///
/// Membership mirrors [`crate::generator::generate`]: the nearest visible,
/// selected ancestor decides, tested with period overlap so a week that
/// straddles two months shows under both. Documents whose date cannot be
/// decoded are dropped.
pub fn filter<F>(
    documents: &[DocumentRef],
    granularity: Granularity,
    context: &SelectionContext,
    visible: &Visibility,
    mut date_of: F,
) -> Vec<MatchedDocument>
where
    F: FnMut(&DocumentRef) -> Option<NaiveDate>,
{
    let scope = resolve_scope(granularity, context, visible);
    documents
        .iter()
        .filter_map(|document| {
            let date = date_of(document)?;
            matches_scope(date, granularity, scope).then(|| MatchedDocument {
                document: document.clone(),
                date,
            })
        })
        .collect()
}

pub fn matches_scope(date: NaiveDate, granularity: Granularity, scope: Scope) -> bool {
    let Scope::Window { ancestor, start, end } = scope else {
        return true;
    };
    match (granularity, ancestor) {
        (Granularity::Daily, Granularity::Weekly) => {
            period::iso_week(date) == period::iso_week(start)
                && period::iso_week_year(date) == period::iso_week_year(start)
        }
        _ => period::periods_overlap(date, granularity, start, end),
    }
}
