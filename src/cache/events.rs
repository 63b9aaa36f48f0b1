//! Invalidation reports.

use time::OffsetDateTime;
use uuid::Uuid;

use super::keys::TagSet;

/// Outcome of one `invalidate` call, logged and returned to the caller.
#[derive(Debug, Clone)]
pub struct InvalidationReport {
    /// Unique identifier used to correlate log lines.
    pub id: Uuid,
    pub tags: Vec<String>,
    /// Entries whose tag set intersected the invalidated tags.
    pub affected: usize,
    /// Entries dropped because nothing was subscribed to them.
    pub evicted: usize,
    /// Entries with subscribers that were refetched immediately.
    pub refetched: usize,
    pub timestamp: OffsetDateTime,
}

impl InvalidationReport {
    pub(crate) fn new(tags: &TagSet) -> Self {
        let mut names: Vec<String> = tags.iter().map(ToString::to_string).collect();
        names.sort();
        Self {
            id: Uuid::new_v4(),
            tags: names,
            affected: 0,
            evicted: 0,
            refetched: 0,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Entries that stayed in the cache marked stale.
    pub fn marked_stale(&self) -> usize {
        self.affected - self.evicted
    }
}
