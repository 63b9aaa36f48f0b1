//! Filter state and partial updates.

use algoref_api_types::{Id, SortBy, SortOrder};

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 50;

/// User-editable list filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterState {
    pub search_text: String,
    pub category_id: Option<Id>,
    pub difficulty_id: Option<Id>,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl FilterState {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            search_text: String::new(),
            category_id: None,
            difficulty_id: None,
            page: 1,
            page_size: page_size.max(1),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }

    /// Apply `patch`, returning the next state.
    ///
    /// A change to search text, category or difficulty moves back to page 1,
    /// even when the same patch also sets `page`. Values equal to the current
    /// ones are not changes. `page_size` is clamped to `1..=max_page_size`.
    pub fn apply(&self, patch: &FilterPatch, max_page_size: u32) -> FilterState {
        let mut next = self.clone();
        let mut filter_changed = false;

        if let Some(text) = &patch.search_text {
            if *text != next.search_text {
                next.search_text = text.clone();
                filter_changed = true;
            }
        }
        if let Some(category) = patch.category_id {
            if category != next.category_id {
                next.category_id = category;
                filter_changed = true;
            }
        }
        if let Some(difficulty) = patch.difficulty_id {
            if difficulty != next.difficulty_id {
                next.difficulty_id = difficulty;
                filter_changed = true;
            }
        }
        if let Some(page) = patch.page {
            next.page = page.max(1);
        }
        if let Some(size) = patch.page_size {
            next.page_size = size.clamp(1, max_page_size.max(1));
        }
        if let Some(sort_by) = patch.sort_by {
            next.sort_by = sort_by;
        }
        if let Some(order) = patch.sort_order {
            next.sort_order = order;
        }

        if filter_changed {
            next.page = 1;
        }
        next
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

/// Partial filter update. `None` leaves a field untouched; for the optional
/// filters `Some(None)` clears the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub search_text: Option<String>,
    pub category_id: Option<Option<Id>>,
    pub difficulty_id: Option<Option<Id>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

impl FilterPatch {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn category(id: Option<Id>) -> Self {
        Self {
            category_id: Some(id),
            ..Self::default()
        }
    }

    pub fn difficulty(id: Option<Id>) -> Self {
        Self {
            difficulty_id: Some(id),
            ..Self::default()
        }
    }

    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn page_size(size: u32) -> Self {
        Self {
            page_size: Some(size),
            ..Self::default()
        }
    }

    pub fn sort(sort_by: SortBy, order: SortOrder) -> Self {
        Self {
            sort_by: Some(sort_by),
            sort_order: Some(order),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn with_category(mut self, id: Option<Id>) -> Self {
        self.category_id = Some(id);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Split off the search text, leaving the fields that apply immediately.
    pub(crate) fn take_search(&mut self) -> Option<String> {
        self.search_text.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_page(page: u32) -> FilterState {
        FilterState {
            page,
            ..FilterState::default()
        }
    }

    #[test]
    fn category_change_resets_page() {
        let next = on_page(5).apply(&FilterPatch::category(Some(3)), MAX_PAGE_SIZE);
        assert_eq!(next.category_id, Some(3));
        assert_eq!(next.page, 1);
    }

    #[test]
    fn reselecting_same_difficulty_keeps_page() {
        let state = FilterState {
            difficulty_id: Some(2),
            page: 4,
            ..FilterState::default()
        };
        let next = state.apply(&FilterPatch::difficulty(Some(2)), MAX_PAGE_SIZE);
        assert_eq!(next.page, 4);
    }

    #[test]
    fn page_change_keeps_filters() {
        let state = FilterState {
            search_text: "graph".into(),
            category_id: Some(1),
            difficulty_id: Some(2),
            ..FilterState::default()
        };
        let next = state.apply(&FilterPatch::page(3), MAX_PAGE_SIZE);
        assert_eq!(next.page, 3);
        assert_eq!(next.search_text, "graph");
        assert_eq!(next.category_id, Some(1));
        assert_eq!(next.difficulty_id, Some(2));
    }

    #[test]
    fn page_size_alone_keeps_page() {
        let next = on_page(4).apply(&FilterPatch::page_size(24), MAX_PAGE_SIZE);
        assert_eq!(next.page, 4);
        assert_eq!(next.page_size, 24);
    }

    #[test]
    fn filter_change_wins_over_explicit_page_and_size() {
        let patch = FilterPatch::category(Some(7))
            .with_page(6)
            .with_page_size(24);
        let next = on_page(5).apply(&patch, MAX_PAGE_SIZE);
        assert_eq!(next.page, 1);
        assert_eq!(next.page_size, 24);
    }

    #[test]
    fn page_and_size_are_clamped() {
        let next = on_page(2).apply(&FilterPatch::page(0).with_page_size(500), MAX_PAGE_SIZE);
        assert_eq!(next.page, 1);
        assert_eq!(next.page_size, MAX_PAGE_SIZE);

        let next = on_page(2).apply(&FilterPatch::page_size(0), MAX_PAGE_SIZE);
        assert_eq!(next.page_size, 1);
    }

    #[test]
    fn clearing_category_counts_as_change() {
        let state = FilterState {
            category_id: Some(3),
            page: 2,
            ..FilterState::default()
        };
        let next = state.apply(&FilterPatch::category(None), MAX_PAGE_SIZE);
        assert_eq!(next.category_id, None);
        assert_eq!(next.page, 1);
    }

    #[test]
    fn sort_change_keeps_page() {
        let next = on_page(3).apply(
            &FilterPatch::sort(SortBy::Title, SortOrder::Asc),
            MAX_PAGE_SIZE,
        );
        assert_eq!(next.page, 3);
        assert_eq!(next.sort_by, SortBy::Title);
    }
}
