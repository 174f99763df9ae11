use std::sync::Arc;

use indexmap::IndexMap;
use tessera_api::Envelope;

/// Key → envelope mapping visible to a render subtree.
///
/// Immutable once built: a `dataFetch` node derives a new context from its
/// parent with [`extend`](DataContext::extend) and hands it to its children.
/// Siblings never observe each other's entries.
#[derive(Debug, Clone, Default)]
pub struct DataContext {
    entries: Arc<IndexMap<String, Envelope>>,
}

impl DataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parent entries with `local` written on top; local keys shadow parent keys.
    pub fn extend(&self, local: IndexMap<String, Envelope>) -> DataContext {
        if local.is_empty() {
            return self.clone();
        }
        let mut entries = (*self.entries).clone();
        for (key, envelope) in local {
            entries.insert(key, envelope);
        }
        DataContext {
            entries: Arc::new(entries),
        }
    }

    pub fn with_entry(&self, key: impl Into<String>, envelope: Envelope) -> DataContext {
        let mut local = IndexMap::new();
        local.insert(key.into(), envelope);
        self.extend(local)
    }

    pub fn get(&self, key: &str) -> Option<&Envelope> {
        self.entries.get(key)
    }

    /// Envelope under `key`, or a pending `{data: null, loading: true}` one.
    pub fn by_key(&self, key: &str) -> Envelope {
        self.get(key).cloned().unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
