//! Query parameter derivation.

use std::collections::BTreeMap;

use serde::Serialize;

use super::filter::FilterState;

/// Canonical request parameters for the algorithm list endpoint.
///
/// Backed by an ordered map, so equal filter states always produce equal
/// parameters in the same order. Unset filters are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<&'static str, String>);

impl QueryParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn as_pairs(&self) -> Vec<(&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn to_query_params(state: &FilterState) -> QueryParams {
    let mut params = BTreeMap::new();
    params.insert("page", state.page.to_string());
    params.insert("size", state.page_size.to_string());
    params.insert("sort_by", state.sort_by.as_str().to_string());
    params.insert("order", state.sort_order.as_str().to_string());

    if let Some(category) = state.category_id {
        params.insert("category_id", category.to_string());
    }
    if let Some(difficulty) = state.difficulty_id {
        params.insert("difficulty_id", difficulty.to_string());
    }
    if !state.search_text.trim().is_empty() {
        params.insert("search", state.search_text.clone());
    }

    QueryParams(params)
}
