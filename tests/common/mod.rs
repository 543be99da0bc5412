//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dice_academy::audit::{AuditFields, AuditMetadata, Auditable};
use dice_academy::config::AppConfig;
use dice_academy::lifecycle::LifecyclePhase;
use dice_academy::persistence::memory::MemoryStore;
use dice_academy::persistence::{DocumentStore, Entity, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

/// Timestamps only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub audit: AuditMetadata,
}

impl Course {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            audit: AuditMetadata::default(),
        }
    }
}

impl Auditable for Course {
    const AUDIT_FIELDS: AuditFields = AuditFields::TIMESTAMPS;

    fn audit_metadata(&self) -> &AuditMetadata {
        &self.audit
    }

    fn audit_metadata_mut(&mut self) -> &mut AuditMetadata {
        &mut self.audit
    }
}

impl Entity for Course {
    const COLLECTION: &'static str = "courses";

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Timestamps and actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: String,
    pub course_id: String,
    pub student: String,
    #[serde(flatten)]
    pub audit: AuditMetadata,
}

impl Enrollment {
    pub fn new(id: impl Into<String>, course_id: impl Into<String>, student: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            course_id: course_id.into(),
            student: student.into(),
            audit: AuditMetadata::default(),
        }
    }
}

impl Auditable for Enrollment {
    const AUDIT_FIELDS: AuditFields = AuditFields::ALL;

    fn audit_metadata(&self) -> &AuditMetadata {
        &self.audit
    }

    fn audit_metadata_mut(&mut self) -> &mut AuditMetadata {
        &mut self.audit
    }
}

impl Entity for Enrollment {
    const COLLECTION: &'static str = "enrollments";

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Declares a collection name that cannot be used on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadlyNamed {
    pub id: String,
    #[serde(flatten)]
    pub audit: AuditMetadata,
}

impl Auditable for BadlyNamed {
    fn audit_metadata(&self) -> &AuditMetadata {
        &self.audit
    }

    fn audit_metadata_mut(&mut self) -> &mut AuditMetadata {
        &mut self.audit
    }
}

impl Entity for BadlyNamed {
    const COLLECTION: &'static str = "Bad/Name";

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Ephemeral port, memory backend, metrics off, short bounds.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.observability.metrics_enabled = false;
    config.lifecycle.startup_timeout_secs = 5;
    config.lifecycle.grace_period_secs = 2;
    config
}

/// Wait until the phase is `Serving` and return the bound address.
pub async fn wait_serving(phase: &mut watch::Receiver<LifecyclePhase>) -> SocketAddr {
    let reached = *tokio::time::timeout(
        Duration::from_secs(5),
        phase.wait_for(|p| p.is_serving() || p.is_terminal()),
    )
    .await
    .expect("startup timed out")
    .expect("bootstrapper dropped");

    match reached {
        LifecyclePhase::Serving(addr) => addr,
        other => panic!("expected serving, got {other}"),
    }
}

/// Client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Memory store whose `ping` takes an adjustable amount of time.
#[derive(Default)]
pub struct SlowStore {
    inner: MemoryStore,
    ping_delay_ms: AtomicU64,
}

impl SlowStore {
    pub fn new(ping_delay: Duration) -> Self {
        let store = Self::default();
        store.set_ping_delay(ping_delay);
        store
    }

    pub fn set_ping_delay(&self, delay: Duration) {
        self.ping_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for SlowStore {
    fn backend(&self) -> &'static str {
        "slow-memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let delay = self.ping_delay_ms.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.inner.ping().await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<bool, StoreError> {
        self.inner.put(collection, id, document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.inner.list(collection).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}
