use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use algoref_api_types::Id;
use tokio::sync::watch;
use tracing::debug;

use super::filter::{DEFAULT_PAGE_SIZE, FilterPatch, FilterState, MAX_PAGE_SIZE};
use super::params::{QueryParams, to_query_params};
use super::timer::Debouncer;
use crate::cache::mutex_lock;

const SOURCE: &str = "query::controller";

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Controller tuning, sourced from the `[query]` settings section.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub debounce: Duration,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl From<&crate::config::QuerySettings> for QueryConfig {
    fn from(settings: &crate::config::QuerySettings) -> Self {
        Self {
            debounce: settings.debounce,
            default_page_size: settings.default_page_size,
            max_page_size: settings.max_page_size,
        }
    }
}

struct Inner {
    config: QueryConfig,
    /// What the user sees; search text here leads the effective value.
    input: Mutex<FilterState>,
    /// What drives queries.
    effective: watch::Sender<FilterState>,
    debouncer: Debouncer,
}

impl Inner {
    /// Promote the input search text to the effective state.
    fn commit_search(&self) {
        let mut input = mutex_lock(&self.input, SOURCE, "commit_search");
        let patch = FilterPatch::search(input.search_text.clone());
        let changed = self.effective.send_if_modified(|effective| {
            let next = effective.apply(&patch, self.config.max_page_size);
            if next == *effective {
                return false;
            }
            *effective = next;
            true
        });
        if changed {
            input.page = self.effective.borrow().page;
            debug!(search = %input.search_text, "Debounced search applied");
        }
    }
}

/// Debounced search/filter/pagination state for the algorithm list.
///
/// Clones share state. Search text edits land in [`input`](Self::input)
/// immediately and reach [`effective`](Self::effective) after the debounce
/// window; every other field applies to both at once.
#[derive(Clone)]
pub struct QueryController {
    inner: Arc<Inner>,
}

impl QueryController {
    pub fn new(config: QueryConfig) -> Self {
        let initial = FilterState::with_page_size(
            config.default_page_size.clamp(1, config.max_page_size.max(1)),
        );
        let (effective, _) = watch::channel(initial.clone());
        Self {
            inner: Arc::new(Inner {
                debouncer: Debouncer::new(config.debounce),
                config,
                input: Mutex::new(initial),
                effective,
            }),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    /// Apply a partial update and return the new input state.
    pub fn set_filter(&self, mut patch: FilterPatch) -> FilterState {
        let search = patch.take_search();
        let mut input = mutex_lock(&self.inner.input, SOURCE, "set_filter");

        if !patch.is_empty() {
            let max = self.inner.config.max_page_size;
            self.inner.effective.send_if_modified(|effective| {
                let next = effective.apply(&patch, max);
                if next == *effective {
                    return false;
                }
                *effective = next;
                true
            });
            let effective = self.inner.effective.borrow();
            input.category_id = effective.category_id;
            input.difficulty_id = effective.difficulty_id;
            input.page = effective.page;
            input.page_size = effective.page_size;
            input.sort_by = effective.sort_by;
            input.sort_order = effective.sort_order;
        }

        let mut search_edited = false;
        if let Some(text) = search {
            if text != input.search_text {
                input.search_text = text;
                search_edited = true;
            }
        }
        let snapshot = input.clone();
        drop(input);

        if search_edited {
            let weak: Weak<Inner> = Arc::downgrade(&self.inner);
            self.inner.debouncer.schedule(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.commit_search();
                }
            });
        }
        snapshot
    }

    /// Select `id`, or clear the selection when `id` is already selected.
    pub fn toggle_category(&self, id: Id) -> FilterState {
        let selected = self.inner.effective.borrow().category_id;
        let next = if selected == Some(id) { None } else { Some(id) };
        self.set_filter(FilterPatch::category(next))
    }

    /// Apply a pending search immediately instead of waiting out the window.
    pub fn flush(&self) -> FilterState {
        if self.inner.debouncer.cancel() {
            self.inner.commit_search();
        }
        self.effective()
    }

    pub fn has_pending_search(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    pub fn input(&self) -> FilterState {
        mutex_lock(&self.inner.input, SOURCE, "input").clone()
    }

    pub fn effective(&self) -> FilterState {
        self.inner.effective.borrow().clone()
    }

    /// Receiver that observes every effective state change.
    pub fn subscribe(&self) -> watch::Receiver<FilterState> {
        self.inner.effective.subscribe()
    }

    pub fn query_params(&self) -> QueryParams {
        to_query_params(&self.inner.effective.borrow())
    }
}

impl Default for QueryController {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_changes(controller: &QueryController) -> Arc<Mutex<Vec<FilterState>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut rx = controller.subscribe();
        let sink = Arc::clone(&seen);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                sink.lock().expect("sink").push(state);
            }
        });
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn keystroke_burst_emits_once_with_last_value() {
        let controller = QueryController::default();
        let seen = collect_changes(&controller);

        for text in ["b", "bi", "bin"] {
            let input = controller.set_filter(FilterPatch::search(text));
            assert_eq!(input.search_text, text);
            assert_eq!(controller.effective().search_text, "");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_millis(300)).await;
        let seen = seen.lock().expect("seen").clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].search_text, "bin");
        assert_eq!(controller.query_params().get("search"), Some("bin"));
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_search_resets_page() {
        let controller = QueryController::default();
        controller.set_filter(FilterPatch::page(4));
        controller.set_filter(FilterPatch::search("sort"));
        assert_eq!(controller.effective().page, 4);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(controller.effective().page, 1);
        assert_eq!(controller.input().page, 1);
    }

    #[tokio::test]
    async fn category_change_resets_page_immediately() {
        let controller = QueryController::default();
        controller.set_filter(FilterPatch::page(5));
        assert_eq!(controller.effective().page, 5);

        let state = controller.set_filter(FilterPatch::category(Some(3)));
        assert_eq!(state.page, 1);
        assert_eq!(controller.effective().category_id, Some(3));
        assert_eq!(controller.effective().page, 1);
    }

    #[tokio::test]
    async fn toggling_selected_category_clears_it() {
        let controller = QueryController::default();
        assert_eq!(controller.toggle_category(2).category_id, Some(2));
        assert_eq!(controller.toggle_category(2).category_id, None);
        assert_eq!(controller.toggle_category(4).category_id, Some(4));
        assert_eq!(controller.toggle_category(5).category_id, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_applies_pending_search() {
        let controller = QueryController::default();
        controller.set_filter(FilterPatch::search("trie"));
        assert!(controller.has_pending_search());

        let effective = controller.flush();
        assert_eq!(effective.search_text, "trie");
        assert!(!controller.has_pending_search());
    }

    #[tokio::test]
    async fn unchanged_values_do_not_publish() {
        let controller = QueryController::default();
        let rx = controller.subscribe();
        controller.set_filter(FilterPatch::difficulty(None));
        controller.set_filter(FilterPatch::page(1));
        assert!(!rx.has_changed().expect("sender alive"));
    }

    #[tokio::test(start_paused = true)]
    async fn search_edit_keeps_other_filters_visible() {
        let controller = QueryController::default();
        controller.set_filter(FilterPatch::category(Some(1)));
        let input = controller.set_filter(FilterPatch::search("dp"));
        assert_eq!(input.category_id, Some(1));
        assert_eq!(input.search_text, "dp");
    }
}
