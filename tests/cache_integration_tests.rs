//! Integration tests for the cache module
//!
//! These tests exercise the public API end to end:
//! - Basic operations and TTL expiry
//! - LRU eviction
//! - Namespace isolation
//! - Memoization, invalidation and warming
//! - Fallback when Redis is unreachable

use compass_cache::cache::{
    BackendKind, CacheBackend, CacheConfig, CacheManager, CallArgs, ManualClock, MemoryBackend,
    Namespace, RemoteConfig,
};
use compass_cache::{generate_key, CacheError};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn unreachable_remote() -> RemoteConfig {
    RemoteConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        connect_timeout: Duration::from_millis(500),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_embedding_expires_after_ttl() {
    init_tracing();
    let cache = CacheManager::in_memory(CacheConfig::default());

    cache
        .set(
            Namespace::Embedding,
            "k1",
            json!([0.1, 0.2, 0.3]),
            Some(Duration::from_secs(1)),
        )
        .await;

    assert_eq!(
        cache.get(Namespace::Embedding, "k1").await.as_deref(),
        Some(&json!([0.1, 0.2, 0.3]))
    );

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let misses_before = cache.stats().await.misses;
    assert!(cache.get(Namespace::Embedding, "k1").await.is_none());
    assert_eq!(cache.stats().await.misses, misses_before + 1);
}

#[tokio::test]
async fn test_expiry_with_manual_clock() {
    let clock = Arc::new(ManualClock::default());
    let backend = MemoryBackend::with_clock(10, clock.clone());

    backend
        .set("leadership", "emp-1", Arc::new(json!(0.82)), Some(Duration::from_secs(7200)))
        .await;

    clock.advance(Duration::from_secs(7199));
    assert!(backend.get("leadership", "emp-1").await.is_some());

    clock.advance(Duration::from_secs(2));
    assert!(backend.get("leadership", "emp-1").await.is_none());
    assert_eq!(backend.stats().await.expirations, Some(1));
}

#[tokio::test]
async fn test_lru_eviction_protects_recently_read() {
    let config = CacheConfig::builder().memory_max_entries(2).build();
    let cache = CacheManager::in_memory(config);
    let ns = Namespace::RoleMatch;

    cache.set(ns, "a", json!(1), None).await;
    cache.set(ns, "b", json!(2), None).await;
    cache.get(ns, "a").await;
    cache.set(ns, "c", json!(3), None).await;

    assert_eq!(cache.get(ns, "a").await.as_deref(), Some(&json!(1)));
    assert!(cache.get(ns, "b").await.is_none());
    assert_eq!(cache.get(ns, "c").await.as_deref(), Some(&json!(3)));

    let stats = cache.stats().await;
    assert_eq!(stats.size, 2);
    assert_eq!(stats.evictions, Some(1));
}

#[tokio::test]
async fn test_clear_namespace_is_isolated() {
    let cache = CacheManager::in_memory(CacheConfig::default());

    cache.set(Namespace::RoleMatch, "m1", json!({"role": "staff"}), None).await;
    cache.set(Namespace::RoleMatch, "m2", json!({"role": "lead"}), None).await;
    cache.set(Namespace::Embedding, "m1", json!([0.4]), None).await;

    cache.clear(Some(Namespace::RoleMatch)).await;

    assert!(cache.get(Namespace::RoleMatch, "m1").await.is_none());
    assert!(cache.get(Namespace::RoleMatch, "m2").await.is_none());
    assert_eq!(
        cache.get(Namespace::Embedding, "m1").await.as_deref(),
        Some(&json!([0.4]))
    );
}

#[tokio::test]
async fn test_same_key_in_different_namespaces() {
    let cache = CacheManager::in_memory(CacheConfig::default());

    cache.set(Namespace::Narrative, "emp-9", json!("story"), None).await;
    cache.set(Namespace::AiResponse, "emp-9", json!("reply"), None).await;

    assert_eq!(
        cache.get(Namespace::Narrative, "emp-9").await.as_deref(),
        Some(&json!("story"))
    );
    assert_eq!(
        cache.get(Namespace::AiResponse, "emp-9").await.as_deref(),
        Some(&json!("reply"))
    );
}

#[test]
fn test_key_independent_of_map_order() {
    let first: Value = serde_json::from_str(r#"{"skills":["rust","go"],"years":8,"level":"senior"}"#)
        .unwrap();
    let second: Value = serde_json::from_str(r#"{"level":"senior","years":8,"skills":["rust","go"]}"#)
        .unwrap();

    assert_eq!(
        CallArgs::new().arg(&first).key().unwrap(),
        CallArgs::new().arg(&second).key().unwrap()
    );

    let reordered_skills = json!({"level": "senior", "years": 8, "skills": ["go", "rust"]});
    assert_ne!(
        CallArgs::new().arg(&first).key().unwrap(),
        CallArgs::new().arg(&reordered_skills).key().unwrap()
    );
}

#[test]
fn test_call_args_match_raw_key_generation() {
    let mut keyword = BTreeMap::new();
    keyword.insert("top_k".to_string(), json!(5));

    let raw = generate_key(&[json!("emp-1")], &keyword);
    let built = CallArgs::new()
        .arg("emp-1")
        .kwarg("top_k", &5)
        .key()
        .unwrap();

    assert_eq!(raw, built);
    assert_eq!(raw.len(), 32);
}

#[tokio::test]
async fn test_memoization_transparency() {
    init_tracing();
    let cache = CacheManager::in_memory(CacheConfig::default());
    let calls = AtomicUsize::new(0);

    let match_roles = |employee: &'static str| {
        let (cache, calls) = (&cache, &calls);
        async move {
            cache
                .cache_role_matching(None)
                .call(
                    CallArgs::new().arg(employee).kwarg("top_k", &3),
                    || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, CacheError>(vec![format!("{}-match", employee)])
                    },
                )
                .await
        }
    };

    assert_eq!(match_roles("emp-1").await.unwrap(), vec!["emp-1-match"]);
    assert_eq!(match_roles("emp-1").await.unwrap(), vec!["emp-1-match"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    match_roles("emp-2").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
}

#[tokio::test]
async fn test_employee_update_forces_recompute() {
    let cache = CacheManager::in_memory(CacheConfig::default());
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let _: f64 = cache
            .cache_leadership_score(None)
            .call(CallArgs::new().arg("emp-5"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>(0.6)
            })
            .await
            .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let event = cache.invalidate_employee("emp-5").await;
    assert!(event.covers(Namespace::Leadership));

    let _: f64 = cache
        .cache_leadership_score(None)
        .call(CallArgs::new().arg("emp-5"), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CacheError>(0.7)
        })
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fallback_to_memory_when_remote_unreachable() {
    init_tracing();
    let config = CacheConfig::builder()
        .use_remote(true)
        .remote(unreachable_remote())
        .build();

    let cache = CacheManager::new(config).await;
    assert_eq!(cache.backend_kind(), BackendKind::Memory);

    let value: String = cache
        .cache_narrative(None)
        .call(CallArgs::new().arg("emp-3"), || async {
            Ok::<_, CacheError>("a fitting story".to_string())
        })
        .await
        .unwrap();
    assert_eq!(value, "a fitting story");
    assert_eq!(cache.stats().await.size, 1);

    let report = serde_json::to_value(cache.report().await).unwrap();
    assert_eq!(report["type"], "memory");
    assert_eq!(report["config"]["requested_backend"], "remote");
}

#[tokio::test]
async fn test_config_from_lookup_drives_manager() {
    let env: BTreeMap<&str, &str> = [
        ("MEMORY_CACHE_MAX_SIZE", "3"),
        ("CACHE_TTL_AI_RESPONSE", "60"),
        ("ENABLE_CACHE_WARMING", "true"),
    ]
    .into_iter()
    .collect();

    let config = CacheConfig::from_lookup(|key: &str| env.get(key).map(|v| v.to_string())).unwrap();
    let cache = CacheManager::new(config).await;

    let report = cache.report().await;
    assert_eq!(report.config.memory_max_size, 3);
    assert_eq!(report.config.ttl_seconds[&Namespace::AiResponse], 60);
    assert!(report.config.cache_warming_enabled);

    let warmed = cache
        .warm("answers", ["q1", "q2"], |q| {
            let cache = &cache;
            async move {
                cache
                    .cache_ai_response(None)
                    .call(CallArgs::new().arg(q), || async move {
                        Ok::<_, CacheError>(format!("answer to {}", q))
                    })
                    .await
            }
        })
        .await;
    assert_eq!(warmed.succeeded, 2);
    assert_eq!(cache.stats().await.size, 2);
}

#[tokio::test]
async fn test_concurrent_access() {
    let cache = Arc::new(CacheManager::in_memory(
        CacheConfig::builder().memory_max_entries(64).build(),
    ));

    let tasks = (0..16).map(|i| {
        let cache = cache.clone();
        tokio::spawn(async move {
            let key = format!("k{}", i % 4);
            cache.set(Namespace::Embedding, &key, json!([i]), None).await;
            cache.get(Namespace::Embedding, &key).await.is_some()
        })
    });

    let results = futures::future::join_all(tasks).await;
    assert!(results.into_iter().all(|r| r.unwrap()));

    let stats = cache.stats().await;
    assert_eq!(stats.size, 4);
    assert_eq!(stats.hits, 16);
}
