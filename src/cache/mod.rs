//! Request cache.
//!
//! Deduplicates concurrent reads of the same query, keeps results keyed by a
//! canonical `QueryKey`, and drops or refreshes them when a mutation
//! invalidates one of their tags.
//!
//! ```toml
//! [cache]
//! idle_eviction_seconds = 60
//! janitor_interval_seconds = 30
//! ```

mod config;
mod entry;
mod events;
mod keys;
mod lock;
mod registry;
mod store;
mod subscription;

pub use config::{CacheConfig, DEFAULT_IDLE_EVICTION_SECS, DEFAULT_JANITOR_INTERVAL_SECS};
pub use entry::{CacheEntry, EntryStatus, ErrorInfo, FailureKind, Fetched};
pub use events::InvalidationReport;
pub use keys::{QueryKey, Tag, TagId, TagKind, TagSet, collection_tags};
pub use registry::TagRegistry;
pub use store::RequestCache;
pub use subscription::Subscription;

pub(crate) use lock::mutex_lock;
