use std::collections::HashSet;
use std::time::Duration;

use algoref::cache::{
    CacheConfig, ErrorInfo, Fetched, QueryKey, RequestCache, Tag, TagKind, TagSet,
    collection_tags,
};
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;
use tokio::sync::oneshot;

fn list_fetcher(
    delay: Duration,
) -> impl Fn() -> futures::future::BoxFuture<'static, Result<Fetched, ErrorInfo>> + Send + Sync {
    use futures::FutureExt;
    move || {
        async move {
            tokio::time::sleep(delay).await;
            Ok(Fetched::new(
                json!({"items": [1, 2]}),
                collection_tags(TagKind::Algorithm, [1, 2]),
            ))
        }
        .boxed()
    }
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let cache = RequestCache::new(CacheConfig {
        idle_eviction: Duration::from_millis(1),
        janitor_interval: None,
    });
    let key = QueryKey::from_value("listAlgorithms", &json!({"page": "1"}));

    // miss + join
    let (first, second) = tokio::join!(
        cache.resolve(key.clone(), list_fetcher(Duration::from_millis(20))),
        cache.resolve(key.clone(), list_fetcher(Duration::from_millis(20)))
    );
    assert!(first.is_success() && second.is_success());

    // hit
    assert!(
        cache
            .resolve(key.clone(), list_fetcher(Duration::ZERO))
            .await
            .is_success()
    );

    // superseded: a primed value overtakes the request in flight
    let superseded_key = QueryKey::new("getAlgorithmBySlug/slow");
    let (release, gate) = oneshot::channel::<()>();
    let gate = std::sync::Mutex::new(Some(gate));
    let slow = {
        let cache = cache.clone();
        let superseded_key = superseded_key.clone();
        tokio::spawn(async move {
            cache
                .resolve(superseded_key, move || {
                    let gate = gate.lock().expect("gate").take();
                    async move {
                        if let Some(gate) = gate {
                            let _ = gate.await;
                        }
                        Ok(Fetched::new(json!("old"), TagSet::new()))
                    }
                })
                .await
        })
    };
    while cache
        .peek(&superseded_key)
        .is_none_or(|entry| !entry.is_loading())
    {
        tokio::task::yield_now().await;
    }
    cache.prime(superseded_key.clone(), json!("new"), TagSet::new());
    release.send(()).expect("release");
    let settled = slow.await.expect("join");
    assert_eq!(settled.payload.as_deref(), Some(&json!("new")));
    // The discarded commit happens on the fetch task; wait for it to land.
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // evict via invalidation and via idle collection
    cache.invalidate(&TagSet::from([
        Tag::list(TagKind::Algorithm),
        Tag::entity(TagKind::Algorithm, 1),
        Tag::entity(TagKind::Algorithm, 2),
    ]));
    tokio::time::sleep(Duration::from_millis(5)).await;
    cache.collect_garbage();

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "algoref_cache_hit_total",
        "algoref_cache_miss_total",
        "algoref_cache_join_total",
        "algoref_cache_superseded_total",
        "algoref_cache_evict_total",
        "algoref_cache_fetch_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
