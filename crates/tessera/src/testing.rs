//! Collaborator doubles for tests
//!
//! [`FlakyStore`] wraps an [`InMemoryStore`] with injectable failures and
//! latency; [`StaticEndpoints`] answers endpoint calls from canned responses.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use tessera_api::{ApiResponse, FindResult, QueryDescriptor};
use tessera_core::{DocumentStore, EndpointClient, InMemoryStore, Result, StoreError};

pub struct FlakyStore {
    inner: InMemoryStore,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    find_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            find_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(self, collection: impl Into<String>) -> Self {
        self.failing.lock().insert(collection.into());
        self
    }

    /// Delay every `find` on `collection` by `delay` (tokio time, so paused clocks apply).
    pub fn with_delay(self, collection: impl Into<String>, delay: Duration) -> Self {
        self.delays.lock().insert(collection.into(), delay);
        self
    }

    pub fn set_failing(&self, collection: &str, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(collection.to_string());
        } else {
            set.remove(collection);
        }
    }

    pub fn set_delay(&self, collection: &str, delay: Option<Duration>) {
        let mut delays = self.delays.lock();
        match delay {
            Some(delay) => delays.insert(collection.to_string(), delay),
            None => delays.remove(collection),
        };
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    async fn gate(&self, collection: &str) -> Result<()> {
        let delay = self.delays.lock().get(collection).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(collection) {
            return Err(StoreError::Transport(format!("{collection} is unavailable")).into());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn find(&self, collection: &str, query: &QueryDescriptor) -> Result<FindResult> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.gate(collection).await?;
        self.inner.find(collection, query).await
    }

    async fn find_by_id(&self, collection: &str, id: &str, depth: Option<u32>) -> Result<Option<Value>> {
        self.gate(collection).await?;
        self.inner.find_by_id(collection, id, depth).await
    }

    async fn find_global(&self, slug: &str, depth: Option<u32>) -> Result<Value> {
        self.gate(slug).await?;
        self.inner.find_global(slug, depth).await
    }

    async fn create(&self, collection: &str, data: Value) -> Result<Value> {
        self.inner.create(collection, data).await
    }

    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<Value> {
        self.inner.update(collection, id, data).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.inner.delete(collection, id).await
    }
}

/// Endpoint client returning canned responses and recording every call.
#[derive(Default)]
pub struct StaticEndpoints {
    responses: HashMap<String, ApiResponse>,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl StaticEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, endpoint: impl Into<String>, response: ApiResponse) -> Self {
        self.responses.insert(endpoint.into(), response);
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl EndpointClient for StaticEndpoints {
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<ApiResponse> {
        self.calls.lock().push((endpoint.to_string(), params.to_vec()));
        self.responses.get(endpoint).cloned().ok_or_else(|| {
            StoreError::Endpoint {
                endpoint: endpoint.to_string(),
                message: "HTTP 404".to_string(),
            }
            .into()
        })
    }
}
