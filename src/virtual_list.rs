//! Windowed rendering of a period column.
//!
//! Only the rows inside the viewport plus a buffer on each side are
//! materialised. Rows have a fixed height so index and pixel offset convert
//! in O(1). Scrolling reconciles the pooled rows against the new range,
//! creating and removing only the delta; selection changes touch at most the
//! two affected rows.

use crate::models::PeriodItem;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::ops::Range;

/// Retained-element backend the selector drives (a widget tree, a DOM, a
/// terminal buffer).
pub trait RowHost {
    type Handle;

    fn create(&mut self, index: usize, item: &PeriodItem, offset: f64, selected: bool) -> Self::Handle;
    fn update(&mut self, handle: &mut Self::Handle, item: &PeriodItem, selected: bool);
    fn set_selected(&mut self, handle: &mut Self::Handle, selected: bool);
    fn remove(&mut self, handle: Self::Handle);
    fn set_content_height(&mut self, height: f64);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub item_height: f64,
    pub viewport_height: f64,
    pub buffer: usize,
}

pub struct VirtualPeriodSelector<H: RowHost> {
    host: H,
    items: Vec<PeriodItem>,
    config: ViewportConfig,
    scroll_top: f64,
    range: Range<usize>,
    pool: BTreeMap<usize, H::Handle>,
    selected: Option<NaiveDate>,
}

impl<H: RowHost> VirtualPeriodSelector<H> {
    pub fn new(host: H, config: ViewportConfig) -> Self {
        debug_assert!(config.item_height > 0.0, "item height must be positive");
        Self {
            host,
            items: Vec::new(),
            config,
            scroll_top: 0.0,
            range: 0..0,
            pool: BTreeMap::new(),
            selected: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn items(&self) -> &[PeriodItem] {
        &self.items
    }

    pub fn visible_range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn offset_of(&self, index: usize) -> f64 {
        index as f64 * self.config.item_height
    }

    pub fn index_at(&self, offset: f64) -> usize {
        if offset <= 0.0 {
            return 0;
        }
        (offset / self.config.item_height).floor() as usize
    }

    pub fn content_height(&self) -> f64 {
        self.offset_of(self.items.len())
    }

    /// Replaces every item and re-renders the visible window from scratch.
    pub fn set_items(&mut self, items: Vec<PeriodItem>) {
        let pooled = std::mem::take(&mut self.pool);
        for (_, handle) in pooled {
            self.host.remove(handle);
        }
        self.items = items;
        self.scroll_top = self.scroll_top.min(self.max_scroll_top());
        self.host.set_content_height(self.content_height());
        self.range = 0..0;
        self.reconcile();
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.config.viewport_height = height.max(0.0);
        self.scroll_top = self.scroll_top.clamp(0.0, self.max_scroll_top());
        self.reconcile();
    }

    pub fn on_scroll(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top.clamp(0.0, self.max_scroll_top());
        self.reconcile();
    }

    /// Moves the highlight; only the previously and newly selected rows are
    /// touched, and only if they are currently rendered.
    pub fn set_selection(&mut self, selected: Option<NaiveDate>) {
        if self.selected == selected {
            return;
        }
        let previous = std::mem::replace(&mut self.selected, selected);
        for date in [previous, selected].into_iter().flatten() {
            let is_selected = Some(date) == selected;
            for index in self.pooled_indices_for(date) {
                if let Some(handle) = self.pool.get_mut(&index) {
                    self.host.set_selected(handle, is_selected);
                }
            }
        }
    }

    /// Swaps one item in place, refreshing its row when rendered.
    pub fn update_item(&mut self, index: usize, item: PeriodItem) -> bool {
        let Some(slot) = self.items.get_mut(index) else {
            return false;
        };
        *slot = item;
        if let Some(handle) = self.pool.get_mut(&index) {
            let selected = Some(self.items[index].date) == self.selected;
            self.host.update(handle, &self.items[index], selected);
        }
        true
    }

    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.items.iter().position(|item| item.date == date)
    }

    /// Scrolls just enough to bring `index` into view and returns the new
    /// scroll offset.
    pub fn scroll_into_view(&mut self, index: usize) -> f64 {
        let top = self.offset_of(index);
        let bottom = top + self.config.item_height;
        let target = if top < self.scroll_top {
            top
        } else if bottom > self.scroll_top + self.config.viewport_height {
            bottom - self.config.viewport_height
        } else {
            self.scroll_top
        };
        self.on_scroll(target);
        self.scroll_top
    }

    fn max_scroll_top(&self) -> f64 {
        (self.content_height() - self.config.viewport_height).max(0.0)
    }

    fn compute_range(&self) -> Range<usize> {
        let total = self.items.len();
        if total == 0 {
            return 0..0;
        }
        let first_visible = self.index_at(self.scroll_top).min(total - 1);
        let visible_count = (self.config.viewport_height / self.config.item_height).ceil() as usize;
        let start = first_visible.saturating_sub(self.config.buffer);
        let end = (first_visible + visible_count + self.config.buffer).min(total);
        start..end
    }

    fn reconcile(&mut self) {
        let next = self.compute_range();
        if next == self.range && self.pool.len() == next.len() {
            return;
        }

        let stale: Vec<usize> = self
            .pool
            .keys()
            .copied()
            .filter(|index| !next.contains(index))
            .collect();
        for index in stale {
            if let Some(handle) = self.pool.remove(&index) {
                self.host.remove(handle);
            }
        }

        for index in next.clone() {
            if self.pool.contains_key(&index) {
                continue;
            }
            let offset = self.offset_of(index);
            let item = &self.items[index];
            let selected = Some(item.date) == self.selected;
            let handle = self.host.create(index, item, offset, selected);
            self.pool.insert(index, handle);
        }

        self.range = next;
    }

    fn pooled_indices_for(&self, date: NaiveDate) -> Vec<usize> {
        self.pool
            .keys()
            .copied()
            .filter(|index| self.items.get(*index).map(|item| item.date) == Some(date))
            .collect()
    }
}
