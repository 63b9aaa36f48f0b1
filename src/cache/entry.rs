//! Cache entry snapshots and fetch outcomes.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;

use super::keys::{QueryKey, TagSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Error category recorded on a failed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request never reached the backend or no response came back.
    Network,
    /// The backend rejected the input (4xx with field detail).
    Validation,
    /// Missing, expired or invalid credential.
    Auth,
    NotFound,
    /// Any other non-success status.
    Server,
    /// The body could not be decoded into the expected shape.
    Decode,
    /// The fetch itself failed inside the client.
    Internal,
}

/// Data form of a fetch error, stored on the entry instead of being thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: FailureKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, None, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Decode, None, message)
    }

    pub fn is_auth(&self) -> bool {
        self.kind == FailureKind::Auth
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} ({status}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

/// Successful fetch result: the payload and the tags it provides.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub payload: Value,
    pub tags: TagSet,
}

impl Fetched {
    pub fn new(payload: Value, tags: TagSet) -> Self {
        Self { payload, tags }
    }
}

/// Point-in-time view of a cache entry.
///
/// Consumers only ever see clones; the live entry is owned by the cache and
/// changes only through `resolve`, `invalidate` and `prime`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub status: EntryStatus,
    pub payload: Option<Arc<Value>>,
    pub error: Option<ErrorInfo>,
    pub tags: TagSet,
    pub last_fetched_at: Option<OffsetDateTime>,
    /// Set by invalidation until the next fetch is issued.
    pub stale: bool,
    /// Issue sequence of the last committed result.
    pub(crate) settled_seq: u64,
}

impl CacheEntry {
    pub(crate) fn idle(key: QueryKey) -> Self {
        Self {
            key,
            status: EntryStatus::Idle,
            payload: None,
            error: None,
            tags: TagSet::new(),
            last_fetched_at: None,
            stale: false,
            settled_seq: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == EntryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == EntryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == EntryStatus::Error
    }

    /// Fresh data that `resolve` may serve without going to the network.
    pub fn is_fresh(&self) -> bool {
        self.is_success() && !self.stale
    }

    /// Decode the payload, if any, into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.payload
            .as_deref()
            .map(|value| T::deserialize(value))
            .transpose()
    }
}
