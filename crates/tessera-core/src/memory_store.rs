//! In-memory document store
//!
//! Collections are plain vectors of JSON documents; queries run through
//! [`execute_query`](crate::query_engine::execute_query). Used by the CLI
//! (loaded from a fixture file) and throughout the test suites.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use tessera_api::value::{document_id, merge_objects};
use tessera_api::{FindResult, QueryDescriptor};

use crate::error::StoreError;
use crate::query_engine::execute_query;
use crate::traits::{DocumentStore, Result};

#[derive(Debug, Default)]
struct StoreState {
    collections: HashMap<String, Vec<Value>>,
    globals: HashMap<String, Value>,
}

/// Document store kept entirely in memory.
///
/// Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection. Intended for construction, before the store is shared.
    pub fn with_collection(self, name: impl Into<String>, docs: Vec<Value>) -> Self {
        self.seed(|state| {
            state.collections.insert(name.into(), docs);
        })
    }

    pub fn with_global(self, slug: impl Into<String>, doc: Value) -> Self {
        self.seed(|state| {
            state.globals.insert(slug.into(), doc);
        })
    }

    /// Build a store from `{"collections": {name: [docs]}, "globals": {slug: doc}}`.
    pub fn from_fixture(fixture: &Value) -> std::result::Result<Self, StoreError> {
        let root = fixture
            .as_object()
            .ok_or_else(|| StoreError::InvalidFixture("fixture root must be an object".into()))?;

        let mut state = StoreState::default();
        if let Some(collections) = root.get("collections") {
            let collections = collections.as_object().ok_or_else(|| {
                StoreError::InvalidFixture("`collections` must be an object".into())
            })?;
            for (name, docs) in collections {
                let docs = docs.as_array().ok_or_else(|| {
                    StoreError::InvalidFixture(format!("collection `{name}` must be an array"))
                })?;
                state.collections.insert(name.clone(), docs.clone());
            }
        }
        if let Some(globals) = root.get("globals") {
            let globals = globals
                .as_object()
                .ok_or_else(|| StoreError::InvalidFixture("`globals` must be an object".into()))?;
            for (slug, doc) in globals {
                state.globals.insert(slug.clone(), doc.clone());
            }
        }

        info!(
            "[InMemoryStore] Loaded fixture: {} collections, {} globals",
            state.collections.len(),
            state.globals.len()
        );
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
        })
    }

    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().await.collections.keys().cloned().collect();
        names.sort();
        names
    }

    fn seed(mut self, apply: impl FnOnce(&mut StoreState)) -> Self {
        match Arc::get_mut(&mut self.state) {
            Some(lock) => apply(lock.get_mut()),
            None => {
                if let Ok(mut state) = self.state.try_write() {
                    apply(&mut state);
                }
            }
        }
        self
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find(&self, collection: &str, query: &QueryDescriptor) -> Result<FindResult> {
        let state = self.state.read().await;
        let docs = state
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        let result = execute_query(docs, query)?;
        debug!(
            "[InMemoryStore] find {}: {} of {} docs",
            collection,
            result.docs.len(),
            result.total_docs
        );
        Ok(result)
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        _depth: Option<u32>,
    ) -> Result<Option<Value>> {
        let state = self.state.read().await;
        let docs = state
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        Ok(docs
            .iter()
            .find(|doc| document_id(doc).as_deref() == Some(id))
            .cloned())
    }

    async fn find_global(&self, slug: &str, _depth: Option<u32>) -> Result<Value> {
        let state = self.state.read().await;
        let doc = state
            .globals
            .get(slug)
            .cloned()
            .ok_or_else(|| StoreError::UnknownGlobal(slug.to_string()))?;
        Ok(doc)
    }

    async fn create(&self, collection: &str, mut data: Value) -> Result<Value> {
        let id = match document_id(&data) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                if let Value::Object(map) = &mut data {
                    map.insert("id".to_string(), Value::String(id.clone()));
                }
                id
            }
        };
        info!("[InMemoryStore] create {}/{}", collection, id);
        let mut state = self.state.write().await;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(data.clone());
        Ok(data)
    }

    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<Value> {
        let mut state = self.state.write().await;
        let docs = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        let doc = docs
            .iter_mut()
            .find(|doc| document_id(doc).as_deref() == Some(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        if let (Value::Object(target), Value::Object(patch)) = (&mut *doc, &data) {
            merge_objects(target, patch);
        }
        info!("[InMemoryStore] update {}/{}", collection, id);
        Ok(doc.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let mut state = self.state.write().await;
        let docs = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        let removed = docs
            .iter()
            .position(|doc| document_id(doc).as_deref() == Some(id))
            .map(|index| docs.remove(index));
        if removed.is_some() {
            info!("[InMemoryStore] delete {}/{}", collection, id);
        }
        Ok(removed)
    }
}
