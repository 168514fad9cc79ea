//! Mount resolution and cache behavior: one detection per mount, safe
//! concurrent resolution, and detection failures that never poison the
//! cache.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::task::JoinSet;

use strongroom::{
    Generation, KvClient, KvError, MemoryTransport, Result, StoreTransport, VersionMetadata,
};

/// Wraps the in-memory transport, counting generation detections and
/// optionally failing the first few of them.
struct CountingTransport {
    inner: MemoryTransport,
    detections: AtomicUsize,
    failures_left: AtomicUsize,
}

impl CountingTransport {
    fn new(inner: MemoryTransport) -> Self {
        Self::failing(inner, 0)
    }

    fn failing(inner: MemoryTransport, failures: usize) -> Self {
        Self { inner, detections: AtomicUsize::new(0), failures_left: AtomicUsize::new(failures) }
    }

    fn detections(&self) -> usize {
        self.detections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreTransport for CountingTransport {
    async fn kv1_get(&self, path: &str) -> Result<Value> {
        self.inner.kv1_get(path).await
    }

    async fn kv1_set(&self, path: &str, values: &Value) -> Result<()> {
        self.inner.kv1_set(path, values).await
    }

    async fn kv1_delete(&self, path: &str) -> Result<()> {
        self.inner.kv1_delete(path).await
    }

    async fn kv1_list(&self, path: &str) -> Result<Vec<String>> {
        self.inner.kv1_list(path).await
    }

    async fn kv2_get(&self, path: &str, version: Option<u64>) -> Result<(Value, VersionMetadata)> {
        self.inner.kv2_get(path, version).await
    }

    async fn kv2_set(&self, path: &str, values: &Value) -> Result<VersionMetadata> {
        self.inner.kv2_set(path, values).await
    }

    async fn kv2_list(&self, path: &str) -> Result<Vec<String>> {
        self.inner.kv2_list(path).await
    }

    async fn kv2_delete(&self, path: &str, versions: &[u64]) -> Result<()> {
        self.inner.kv2_delete(path, versions).await
    }

    async fn kv2_undelete(&self, path: &str, versions: &[u64]) -> Result<()> {
        self.inner.kv2_undelete(path, versions).await
    }

    async fn kv2_destroy(&self, path: &str, versions: &[u64]) -> Result<()> {
        self.inner.kv2_destroy(path, versions).await
    }

    async fn kv2_destroy_metadata(&self, path: &str) -> Result<()> {
        self.inner.kv2_destroy_metadata(path).await
    }

    async fn kv2_read_metadata(&self, path: &str) -> Result<Vec<VersionMetadata>> {
        self.inner.kv2_read_metadata(path).await
    }

    async fn is_v2_mount(&self, mount: &str) -> Result<bool> {
        self.detections.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(KvError::transport("mount table briefly unavailable"));
        }
        self.inner.is_v2_mount(mount).await
    }

    fn split_mount(&self, path: &str) -> (String, String) {
        self.inner.split_mount(path)
    }
}

fn two_mounts() -> MemoryTransport {
    MemoryTransport::new()
        .with_mount("secret", Generation::V2)
        .with_mount("legacy", Generation::V1)
}

#[tokio::test]
async fn test_mount_generation_idempotent() {
    let transport = Arc::new(CountingTransport::new(two_mounts()));
    let client = KvClient::new(transport.clone());

    for _ in 0..5 {
        assert_eq!(client.mount_generation("secret/app").await.unwrap(), Generation::V2);
    }

    assert_eq!(transport.detections(), 1);
}

#[tokio::test]
async fn test_each_mount_detected_independently() {
    let transport = Arc::new(CountingTransport::new(two_mounts()));
    let client = KvClient::new(transport.clone());

    client.set("secret/app", &json!({"n": 1})).await.unwrap();
    client.set("legacy/app", &json!({"n": 1})).await.unwrap();
    client.set("secret/other", &json!({"n": 2})).await.unwrap();
    client.set("legacy/other", &json!({"n": 2})).await.unwrap();

    assert_eq!(transport.detections(), 2);
    assert_eq!(client.resolved_mounts().await, vec!["legacy", "secret"]);
}

#[tokio::test]
async fn concurrent_first_resolution_detects_once() {
    let transport = Arc::new(CountingTransport::new(two_mounts()));
    let client = KvClient::new(transport.clone());

    let mut jobs = JoinSet::new();
    for i in 0..16 {
        let client = client.clone();
        jobs.spawn(async move {
            let path = format!("secret/app/{}", i);
            client.mount_generation(&path).await
        });
    }

    let mut generations = HashSet::new();
    while let Some(result) = jobs.join_next().await {
        let generation = result.expect("task panicked").expect("resolution failed");
        generations.insert(generation);
    }

    assert_eq!(generations.len(), 1, "all callers must observe the same generation");
    assert!(generations.contains(&Generation::V2));
    assert_eq!(transport.detections(), 1);
    assert_eq!(client.resolved_mounts().await, vec!["secret"]);
}

#[tokio::test]
async fn concurrent_mixed_operations_resolve_each_mount_once() {
    let transport = Arc::new(CountingTransport::new(two_mounts()));
    let client = KvClient::new(transport.clone());

    let mut jobs = JoinSet::new();
    for i in 0..16usize {
        let client = client.clone();
        let mount = if i % 2 == 0 { "secret" } else { "legacy" };
        jobs.spawn(async move {
            let path = format!("{}/worker-{}", mount, i);
            client.set(&path, &json!({ "worker": i })).await?;
            let (value, _): (Value, _) = client.get(&path, Default::default()).await?;
            Ok::<_, KvError>(value)
        });
    }

    let mut completed = 0usize;
    while let Some(result) = jobs.join_next().await {
        let value = result.expect("task panicked").expect("operation failed");
        assert!(value.get("worker").is_some());
        completed += 1;
    }

    assert_eq!(completed, 16);
    assert_eq!(transport.detections(), 2);
}

#[tokio::test]
async fn test_detection_failure_not_cached() {
    let transport = Arc::new(CountingTransport::failing(two_mounts(), 1));
    let client = KvClient::new(transport.clone());

    let err = client.mount_generation("secret/app").await.unwrap_err();
    assert!(matches!(err, KvError::Transport { .. }));
    assert!(client.resolved_mounts().await.is_empty());

    // The next attempt redoes detection and succeeds.
    assert_eq!(client.mount_generation("secret/app").await.unwrap(), Generation::V2);
    assert_eq!(transport.detections(), 2);
    assert_eq!(client.resolved_mounts().await, vec!["secret"]);
}

#[tokio::test]
async fn concurrent_resolution_survives_one_detection_failure() {
    let transport = Arc::new(CountingTransport::failing(two_mounts(), 1));
    let client = KvClient::new(transport.clone());

    let mut jobs = JoinSet::new();
    for _ in 0..8 {
        let client = client.clone();
        jobs.spawn(async move { client.mount_generation("secret/app").await });
    }

    let mut failures = 0usize;
    let mut successes = 0usize;
    while let Some(result) = jobs.join_next().await {
        match result.expect("task panicked") {
            Ok(generation) => {
                assert_eq!(generation, Generation::V2);
                successes += 1;
            }
            Err(err) => {
                assert!(matches!(err, KvError::Transport { .. }));
                failures += 1;
            }
        }
    }

    // Resolution serializes on the exclusive lock, so exactly the first
    // detection fails and exactly one caller sees it.
    assert_eq!(failures, 1);
    assert_eq!(successes, 7);
    assert_eq!(transport.detections(), 2);
}

#[tokio::test]
async fn test_unknown_mount_detection_not_found() {
    let transport = Arc::new(CountingTransport::new(two_mounts()));
    let client = KvClient::new(transport.clone());

    let err = client.set("missing/app", &json!({"n": 1})).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(client.resolved_mounts().await.is_empty());

    // The unknown mount is probed again on the next call, not negatively
    // cached.
    let _ = client.mount_generation("missing/app").await;
    assert_eq!(transport.detections(), 2);
}

#[tokio::test]
async fn test_clones_share_resolved_mounts() {
    let transport = Arc::new(CountingTransport::new(two_mounts()));
    let client = KvClient::new(transport.clone());

    client.mount_generation("secret/app").await.unwrap();

    let clone = client.clone();
    clone.mount_generation("secret/deeper/path").await.unwrap();
    clone.set("secret/deeper/path", &json!({"n": 1})).await.unwrap();

    assert_eq!(transport.detections(), 1);
}
