//! Backend REST access.

mod catalog;
mod client;
mod error;

pub use catalog::{
    Catalog, GET_ALGORITHM_BY_SLUG, GET_CATEGORY_BY_SLUG, GET_CURRENT_USER, LIST_ALGORITHMS,
    LIST_CATEGORIES, LIST_LANGUAGES, QueryState, algorithm_detail_key, algorithm_list_key,
    category_detail_key,
};
pub use client::{ApiClient, ApiConfig, ApiPath, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use error::{ApiError, FieldError};
