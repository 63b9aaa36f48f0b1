//! Typed, cached reads of the public catalog.

use std::sync::Arc;

use algoref_api_types::{
    Algorithm, Category, CurrentUser, PaginatedAlgorithms, ProgrammingLanguage,
};
use futures::Stream;
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;

use super::client::{ApiClient, ApiPath};
use crate::cache::{
    CacheEntry, EntryStatus, ErrorInfo, Fetched, QueryKey, RequestCache, Tag, TagKind, TagSet,
    collection_tags,
};
use crate::query::{FilterState, QueryController, QueryParams, to_query_params};
use crate::session::SessionGuard;

pub const LIST_ALGORITHMS: &str = "listAlgorithms";
pub const GET_ALGORITHM_BY_SLUG: &str = "getAlgorithmBySlug";
pub const LIST_CATEGORIES: &str = "listCategories";
pub const GET_CATEGORY_BY_SLUG: &str = "getCategoryBySlug";
pub const LIST_LANGUAGES: &str = "listLanguages";
pub const GET_CURRENT_USER: &str = "getCurrentUser";

pub fn algorithm_list_key(params: &QueryParams) -> QueryKey {
    let map: Map<String, Value> = params
        .as_pairs()
        .into_iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect();
    QueryKey::from_value(LIST_ALGORITHMS, &Value::Object(map))
}

pub fn algorithm_detail_key(slug: &str) -> QueryKey {
    QueryKey::from_value(GET_ALGORITHM_BY_SLUG, &json!({ "slug": slug }))
}

pub fn category_detail_key(slug: &str) -> QueryKey {
    QueryKey::from_value(GET_CATEGORY_BY_SLUG, &json!({ "slug": slug }))
}

/// Typed view of a cache entry.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub status: EntryStatus,
    /// Last good data; kept while refetching and after a failed refetch.
    pub data: Option<T>,
    pub error: Option<ErrorInfo>,
    pub stale: bool,
    pub last_fetched_at: Option<OffsetDateTime>,
}

impl<T: DeserializeOwned> QueryState<T> {
    pub fn from_entry(entry: &CacheEntry) -> Self {
        let (data, decode_error) = match entry.decode::<T>() {
            Ok(data) => (data, None),
            Err(err) => (None, Some(ErrorInfo::decode(err.to_string()))),
        };
        let status = if decode_error.is_some() {
            EntryStatus::Error
        } else {
            entry.status
        };
        Self {
            status,
            data,
            error: decode_error.or_else(|| entry.error.clone()),
            stale: entry.stale,
            last_fetched_at: entry.last_fetched_at,
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == EntryStatus::Loading
    }

    /// Data on success, the recorded error otherwise.
    pub fn into_result(self) -> Result<T, ErrorInfo> {
        match (self.status, self.data, self.error) {
            (EntryStatus::Success, Some(data), _) => Ok(data),
            (_, _, Some(error)) => Err(error),
            (status, _, None) => Err(ErrorInfo::internal(format!(
                "query settled as {status:?} without data"
            ))),
        }
    }
}

/// Catalog reads resolved through the request cache.
#[derive(Clone)]
pub struct Catalog {
    client: ApiClient,
    cache: RequestCache,
    guard: Option<SessionGuard>,
}

impl Catalog {
    pub fn new(client: ApiClient, cache: RequestCache) -> Self {
        Self {
            client,
            cache,
            guard: None,
        }
    }

    /// Route auth failures from reads to `guard`.
    pub fn with_guard(mut self, guard: SessionGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub async fn list_algorithms(&self, state: &FilterState) -> QueryState<PaginatedAlgorithms> {
        let params = to_query_params(state);
        let key = algorithm_list_key(&params);
        let query: Vec<(String, String)> = params
            .as_pairs()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let fetcher = fetcher(
            self.client.clone(),
            ApiPath::from("algorithms"),
            query,
            |page: &PaginatedAlgorithms| {
                collection_tags(TagKind::Algorithm, page.items.iter().map(|item| item.id))
            },
        );
        self.read(key, fetcher).await
    }

    pub async fn algorithm_by_slug(&self, slug: &str) -> QueryState<Algorithm> {
        let fetcher = fetcher(
            self.client.clone(),
            ApiPath::from("algorithms").segment(slug),
            Vec::new(),
            |algorithm: &Algorithm| TagSet::from([Tag::entity(TagKind::Algorithm, algorithm.id)]),
        );
        self.read(algorithm_detail_key(slug), fetcher).await
    }

    pub async fn categories(&self) -> QueryState<Vec<Category>> {
        let fetcher = fetcher(
            self.client.clone(),
            ApiPath::from("categories"),
            Vec::new(),
            |categories: &Vec<Category>| {
                collection_tags(TagKind::Category, categories.iter().map(|c| c.id))
            },
        );
        self.read(QueryKey::new(LIST_CATEGORIES), fetcher).await
    }

    pub async fn category_by_slug(&self, slug: &str) -> QueryState<Category> {
        let fetcher = fetcher(
            self.client.clone(),
            ApiPath::from("categories").segment(slug),
            Vec::new(),
            |category: &Category| TagSet::from([Tag::entity(TagKind::Category, category.id)]),
        );
        self.read(category_detail_key(slug), fetcher).await
    }

    pub async fn languages(&self) -> QueryState<Vec<ProgrammingLanguage>> {
        let fetcher = fetcher(
            self.client.clone(),
            ApiPath::from("languages"),
            Vec::new(),
            |languages: &Vec<ProgrammingLanguage>| {
                collection_tags(TagKind::Language, languages.iter().map(|l| l.id))
            },
        );
        self.read(QueryKey::new(LIST_LANGUAGES), fetcher).await
    }

    pub async fn current_user(&self) -> QueryState<CurrentUser> {
        let fetcher = fetcher(
            self.client.clone(),
            ApiPath::from("auth/me"),
            Vec::new(),
            |_: &CurrentUser| TagSet::from([Tag::current(TagKind::User)]),
        );
        self.read(QueryKey::new(GET_CURRENT_USER), fetcher).await
    }

    /// Resolve the list for every effective state `controller` publishes,
    /// starting with the current one.
    pub fn follow(
        &self,
        controller: &QueryController,
    ) -> impl Stream<Item = (FilterState, QueryState<PaginatedAlgorithms>)> + use<> {
        let catalog = self.clone();
        let mut rx = controller.subscribe();
        async_stream::stream! {
            loop {
                let state = rx.borrow_and_update().clone();
                let result = catalog.list_algorithms(&state).await;
                yield (state, result);
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    async fn read<T, F>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        T: DeserializeOwned,
        F: Fn() -> BoxFuture<'static, Result<Fetched, ErrorInfo>> + Send + Sync + 'static,
    {
        let entry = self.cache.resolve(key, fetcher).await;
        if let (Some(guard), Some(error)) = (&self.guard, &entry.error) {
            if entry.is_error() && error.is_auth() {
                guard.escalate(error.clone()).await;
            }
        }
        QueryState::from_entry(&entry)
    }
}

/// Build a fetcher that GETs `path`, decodes it as `T` and tags the result.
fn fetcher<T, G>(
    client: ApiClient,
    path: ApiPath,
    query: Vec<(String, String)>,
    tags_of: G,
) -> impl Fn() -> BoxFuture<'static, Result<Fetched, ErrorInfo>> + Send + Sync + 'static
where
    T: DeserializeOwned + Serialize + Send + 'static,
    G: Fn(&T) -> TagSet + Copy + Send + Sync + 'static,
{
    let shared = Arc::new((client, path, query));
    move || {
        let shared = Arc::clone(&shared);
        async move {
            let (client, path, query) = &*shared;
            let pairs: Vec<(&str, &str)> = query
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect();
            let data: T = client
                .get(path.clone(), &pairs)
                .await
                .map_err(ErrorInfo::from)?;
            let tags = tags_of(&data);
            let payload =
                serde_json::to_value(&data).map_err(|err| ErrorInfo::decode(err.to_string()))?;
            Ok(Fetched::new(payload, tags))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterPatch;

    #[test]
    fn list_keys_ignore_construction_order() {
        let a = FilterState::default().apply(
            &FilterPatch::category(Some(3)).with_page_size(24),
            50,
        );
        let mut b = FilterState::default().apply(&FilterPatch::page_size(24), 50);
        b = b.apply(&FilterPatch::category(Some(3)), 50);
        assert_eq!(
            algorithm_list_key(&to_query_params(&a)),
            algorithm_list_key(&to_query_params(&b))
        );
    }

    #[test]
    fn decode_failure_becomes_error_state() {
        let entry = RequestCache::default().prime(
            QueryKey::new("x"),
            json!({"unexpected": true}),
            TagSet::new(),
        );
        let state: QueryState<Category> = QueryState::from_entry(&entry);
        assert_eq!(state.status, EntryStatus::Error);
        assert!(state.into_result().is_err());
    }
}
