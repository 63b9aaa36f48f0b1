//! Request cache storage.
//!
//! One entry per `QueryKey`, each backed by a `watch` channel so waiters and
//! subscribers observe the same snapshots. Fetches run as spawned tasks and
//! commit through a cache-wide issue sequence: a response is applied only when
//! it is newer than the last committed one for the same slot.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::FutureExt;
use futures::future::BoxFuture;
use metrics::{counter, histogram};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use super::config::CacheConfig;
use super::entry::{CacheEntry, EntryStatus, ErrorInfo, Fetched};
use super::events::InvalidationReport;
use super::keys::{QueryKey, TagSet};
use super::lock::mutex_lock;
use super::registry::TagRegistry;
use super::subscription::Subscription;

const SOURCE: &str = "cache::store";

const METRIC_CACHE_HIT: &str = "algoref_cache_hit_total";
const METRIC_CACHE_MISS: &str = "algoref_cache_miss_total";
const METRIC_CACHE_JOIN: &str = "algoref_cache_join_total";
const METRIC_CACHE_SUPERSEDED: &str = "algoref_cache_superseded_total";
const METRIC_CACHE_EVICT: &str = "algoref_cache_evict_total";
const METRIC_CACHE_FETCH_MS: &str = "algoref_cache_fetch_ms";

type FetchFuture = BoxFuture<'static, Result<Fetched, ErrorInfo>>;
type SharedFetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

struct Slot {
    tx: watch::Sender<CacheEntry>,
    /// Sequence counter value when the slot was created. Responses at or
    /// below it were issued for an earlier slot under the same key.
    origin: u64,
    /// Sequence of the most recently issued request (or prime).
    issued_seq: u64,
    /// Fetcher from the last `resolve`, reused for invalidation refetches.
    fetcher: Option<SharedFetcher>,
    /// Tags invalidated since the last successful commit.
    invalidated: TagSet,
    last_touched: Instant,
}

impl Slot {
    fn new(key: QueryKey, origin: u64) -> Self {
        let (tx, _) = watch::channel(CacheEntry::idle(key));
        Self {
            tx,
            origin,
            issued_seq: 0,
            fetcher: None,
            invalidated: TagSet::new(),
            last_touched: Instant::now(),
        }
    }

    fn settled_seq(&self) -> u64 {
        self.tx.borrow().settled_seq
    }

    fn in_flight(&self) -> bool {
        self.issued_seq > self.settled_seq()
    }

    /// Subscriptions plus callers currently waiting in `resolve`.
    fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }

    fn snapshot(&self) -> CacheEntry {
        self.tx.borrow().clone()
    }
}

#[derive(Default)]
struct CacheState {
    slots: HashMap<QueryKey, Slot>,
    tags: TagRegistry,
}

struct Inner {
    config: CacheConfig,
    state: Mutex<CacheState>,
    /// Last sequence handed out. Shared by every key and never reset.
    seq: AtomicU64,
}

impl Inner {
    fn lock(&self, op: &'static str) -> MutexGuard<'_, CacheState> {
        mutex_lock(&self.state, SOURCE, op)
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    fn commit(&self, key: &QueryKey, seq: u64, outcome: Result<Fetched, ErrorInfo>) {
        let mut state = self.lock("commit");
        let CacheState { slots, tags } = &mut *state;

        let Some(slot) = slots.get_mut(key) else {
            debug!(key = %key, seq, "Discarding response for evicted entry");
            return;
        };

        if seq <= slot.origin {
            counter!(METRIC_CACHE_SUPERSEDED).increment(1);
            debug!(key = %key, seq, "Discarding response issued before the entry was recreated");
            return;
        }

        if seq <= slot.settled_seq() {
            counter!(METRIC_CACHE_SUPERSEDED).increment(1);
            debug!(
                key = %key,
                seq,
                settled_seq = slot.settled_seq(),
                "Discarding superseded response"
            );
            return;
        }

        let newer_in_flight = slot.issued_seq > seq;
        match &outcome {
            Ok(fetched) => {
                tags.register(key, &fetched.tags);
                slot.invalidated.clear();
            }
            Err(error) => {
                warn!(key = %key, seq, error = %error, "Fetch failed; recorded on entry");
            }
        }

        slot.tx.send_modify(|entry| {
            entry.settled_seq = seq;
            match outcome {
                Ok(fetched) => {
                    entry.status = EntryStatus::Success;
                    entry.payload = Some(Arc::new(fetched.payload));
                    entry.error = None;
                    entry.tags = fetched.tags;
                    entry.last_fetched_at = Some(OffsetDateTime::now_utc());
                }
                Err(error) => {
                    // Previous payload stays in place for display.
                    entry.status = EntryStatus::Error;
                    entry.error = Some(error);
                }
            }
            if newer_in_flight {
                entry.status = EntryStatus::Loading;
            }
        });
    }
}

/// Process-wide request cache.
///
/// Cheap to clone; clones share the same entries. Construct one per
/// application (or per test) and hand it to the components that need it.
#[derive(Clone)]
pub struct RequestCache {
    inner: Arc<Inner>,
}

impl RequestCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(CacheState::default()),
                seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Resolve `key`, fetching only when no fresh data is cached.
    ///
    /// Fresh `Success` entries are returned immediately. A non-stale request
    /// already in flight is joined rather than duplicated. Otherwise a new
    /// request is issued; the previous payload remains visible while it runs.
    /// Always returns an entry in `Success` or `Error`: when a newer request
    /// for the key was issued meanwhile, the call settles with that one.
    pub async fn resolve<F, Fut>(&self, key: QueryKey, fetcher: F) -> CacheEntry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Fetched, ErrorInfo>> + Send + 'static,
    {
        let fetcher = share(fetcher);
        let (rx, seq) = {
            let mut state = self.inner.lock("resolve");
            let origin = self.inner.current_seq();
            let slot = state
                .slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(key.clone(), origin));
            slot.last_touched = Instant::now();
            slot.fetcher = Some(Arc::clone(&fetcher));

            let (fresh, stale) = {
                let entry = slot.tx.borrow();
                (entry.is_fresh(), entry.stale)
            };
            if fresh {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(key = %key, "Cache hit");
                return slot.snapshot();
            }

            let seq = if slot.in_flight() && !stale {
                counter!(METRIC_CACHE_JOIN).increment(1);
                debug!(key = %key, seq = slot.issued_seq, "Joining in-flight request");
                slot.issued_seq
            } else {
                counter!(METRIC_CACHE_MISS).increment(1);
                issue(&self.inner, &key, slot, &fetcher)
            };
            (slot.tx.subscribe(), seq)
        };

        wait_settled(rx, seq).await
    }

    /// Issue a new request for `key` regardless of freshness.
    pub async fn refetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> CacheEntry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Fetched, ErrorInfo>> + Send + 'static,
    {
        let fetcher = share(fetcher);
        let (rx, seq) = {
            let mut state = self.inner.lock("refetch");
            let origin = self.inner.current_seq();
            let slot = state
                .slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(key.clone(), origin));
            slot.last_touched = Instant::now();
            slot.fetcher = Some(Arc::clone(&fetcher));
            counter!(METRIC_CACHE_MISS).increment(1);
            let seq = issue(&self.inner, &key, slot, &fetcher);
            (slot.tx.subscribe(), seq)
        };

        wait_settled(rx, seq).await
    }

    /// Mark every entry tagged with any of `tags` as stale.
    ///
    /// Entries nobody subscribes to are evicted once all of their tags have
    /// been invalidated; entries with subscribers are refetched right away
    /// when called inside a tokio runtime.
    pub fn invalidate(&self, tags: &TagSet) -> InvalidationReport {
        let can_spawn = tokio::runtime::Handle::try_current().is_ok();
        let mut report = InvalidationReport::new(tags);

        {
            let mut state = self.inner.lock("invalidate");
            let CacheState {
                slots,
                tags: registry,
            } = &mut *state;

            for key in registry.keys_for_tags(tags) {
                report.affected += 1;
                let Some(slot) = slots.get_mut(&key) else {
                    registry.unregister(&key);
                    continue;
                };

                slot.invalidated.extend(tags.iter().copied());
                let fully_invalidated = slot.tx.borrow().tags.is_subset(&slot.invalidated);

                if slot.subscribers() == 0 && !slot.in_flight() && fully_invalidated {
                    slots.remove(&key);
                    registry.unregister(&key);
                    report.evicted += 1;
                    counter!(METRIC_CACHE_EVICT).increment(1);
                    continue;
                }

                slot.tx.send_modify(|entry| entry.stale = true);

                if slot.subscribers() > 0 && can_spawn {
                    if let Some(fetcher) = slot.fetcher.clone() {
                        issue(&self.inner, &key, slot, &fetcher);
                        report.refetched += 1;
                    }
                }
            }
        }

        info!(
            invalidation_id = %report.id,
            tags = ?report.tags,
            affected = report.affected,
            evicted = report.evicted,
            refetched = report.refetched,
            "Cache tags invalidated"
        );
        report
    }

    /// Seed `key` with a known payload, as if a request had just succeeded.
    ///
    /// Supersedes any request for `key` still in flight.
    pub fn prime(&self, key: QueryKey, payload: Value, tags: TagSet) -> CacheEntry {
        let mut state = self.inner.lock("prime");
        let CacheState {
            slots,
            tags: registry,
        } = &mut *state;

        let origin = self.inner.current_seq();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone(), origin));
        let seq = self.inner.next_seq();
        slot.issued_seq = seq;
        slot.last_touched = Instant::now();
        slot.invalidated.clear();
        registry.register(&key, &tags);

        slot.tx.send_modify(|entry| {
            entry.settled_seq = seq;
            entry.status = EntryStatus::Success;
            entry.payload = Some(Arc::new(payload));
            entry.error = None;
            entry.tags = tags;
            entry.last_fetched_at = Some(OffsetDateTime::now_utc());
            entry.stale = false;
        });
        debug!(key = %key, seq, "Cache entry primed");
        slot.snapshot()
    }

    /// Subscribe to `key`, creating an idle entry on first access.
    pub fn subscribe(&self, key: QueryKey) -> Subscription {
        let mut state = self.inner.lock("subscribe");
        let origin = self.inner.current_seq();
        let slot = state
            .slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key, origin));
        slot.last_touched = Instant::now();
        Subscription::new(slot.tx.subscribe())
    }

    /// Current snapshot for `key` without touching it.
    pub fn peek(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.inner.lock("peek").slots.get(key).map(Slot::snapshot)
    }

    /// Drop entries that are unsubscribed, settled and idle past the window.
    pub fn collect_garbage(&self) -> usize {
        let idle_window = self.inner.config.idle_eviction;
        let now = Instant::now();
        let mut state = self.inner.lock("collect_garbage");
        let CacheState { slots, tags } = &mut *state;

        let expired: Vec<QueryKey> = slots
            .iter()
            .filter(|(_, slot)| {
                slot.subscribers() == 0
                    && !slot.in_flight()
                    && now.duration_since(slot.last_touched) >= idle_window
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            slots.remove(key);
            tags.unregister(key);
        }

        if !expired.is_empty() {
            counter!(METRIC_CACHE_EVICT).increment(expired.len() as u64);
            debug!(evicted = expired.len(), "Idle cache entries collected");
        }
        expired.len()
    }

    /// Run `collect_garbage` periodically until the cache is dropped.
    ///
    /// Returns `None` when the janitor is disabled in the configuration.
    pub fn spawn_janitor(&self) -> Option<JoinHandle<()>> {
        let period = self.inner.config.janitor_interval?;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    debug!("Cache dropped; janitor exiting");
                    break;
                };
                RequestCache { inner }.collect_garbage();
            }
        }))
    }

    /// Drop every entry. Requests still in flight settle as errors.
    pub fn clear(&self) {
        let mut state = self.inner.lock("clear");
        for slot in state.slots.values() {
            if slot.in_flight() {
                let seq = slot.issued_seq;
                slot.tx.send_modify(|entry| {
                    entry.settled_seq = seq;
                    entry.status = EntryStatus::Error;
                    entry.error = Some(ErrorInfo::internal("cache cleared"));
                });
            }
        }
        state.slots.clear();
        state.tags.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock("len").slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tags currently recorded for `key`.
    pub fn tags_for(&self, key: &QueryKey) -> TagSet {
        self.inner.lock("tags_for").tags.tags_for_key(key)
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

fn share<F, Fut>(fetcher: F) -> SharedFetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Fetched, ErrorInfo>> + Send + 'static,
{
    Arc::new(move || fetcher().boxed())
}

/// Start a request for `key` and return its issue sequence.
fn issue(inner: &Arc<Inner>, key: &QueryKey, slot: &mut Slot, fetcher: &SharedFetcher) -> u64 {
    let seq = inner.next_seq();
    slot.issued_seq = seq;
    slot.tx.send_modify(|entry| {
        entry.status = EntryStatus::Loading;
        entry.stale = false;
    });

    let fetch = fetcher();
    let inner = Arc::clone(inner);
    let task_key = key.clone();
    let span = info_span!("cache_fetch", key = %key, seq);
    tokio::spawn(
        async move {
            let started = std::time::Instant::now();
            let outcome = AssertUnwindSafe(fetch)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(ErrorInfo::internal("fetch task panicked")));
            histogram!(METRIC_CACHE_FETCH_MS).record(started.elapsed().as_secs_f64() * 1000.0);
            inner.commit(&task_key, seq, outcome);
        }
        .instrument(span),
    );

    debug!(key = %key, seq, "Request issued");
    seq
}

/// Wait until request `seq` and every request issued after it have settled.
async fn wait_settled(mut rx: watch::Receiver<CacheEntry>, seq: u64) -> CacheEntry {
    let settled = rx
        .wait_for(|entry| entry.settled_seq >= seq && !entry.is_loading())
        .await
        .map(|entry| entry.clone());
    match settled {
        Ok(entry) => entry,
        Err(_) => {
            let mut entry = rx.borrow().clone();
            if entry.is_loading() {
                entry.status = EntryStatus::Error;
                entry.error = Some(ErrorInfo::internal("cache entry dropped"));
            }
            entry
        }
    }
}
