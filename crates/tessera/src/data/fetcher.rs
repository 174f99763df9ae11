use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use tessera_api::value::docs_from;
use tessera_api::{QueryDescriptor, SourceDescriptor, SourceTarget};
use tessera_core::{encode_endpoint_params, DocumentStore, EndpointClient, StoreError};

use crate::error::FetchError;

/// What one source produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePayload {
    pub docs: Vec<Value>,
    /// Total reported by the collaborator, when it reports one.
    pub total_docs: Option<u64>,
    /// The collaborator's response as received.
    pub raw: Value,
}

impl SourcePayload {
    /// Reported total, or the number of documents actually returned.
    pub fn total(&self) -> u64 {
        self.total_docs.unwrap_or(self.docs.len() as u64)
    }
}

/// Per-source fetch outcome. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Fetched(SourcePayload),
    Failed { error: String, source: String },
}

impl RawResult {
    pub fn payload(&self) -> Option<&SourcePayload> {
        match self {
            RawResult::Fetched(payload) => Some(payload),
            RawResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RawResult::Fetched(_) => None,
            RawResult::Failed { error, .. } => Some(error),
        }
    }
}

/// Issues source fetches against the configured collaborators.
#[derive(Clone)]
pub struct DataFetcher {
    store: Arc<dyn DocumentStore>,
    endpoints: Option<Arc<dyn EndpointClient>>,
}

impl DataFetcher {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            endpoints: None,
        }
    }

    pub fn with_endpoints(mut self, client: Arc<dyn EndpointClient>) -> Self {
        self.endpoints = Some(client);
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Fetch every source concurrently.
    ///
    /// Each source uses its own `query` when set, else `default_query`.
    /// Succeeds with per-source results as long as at least one source
    /// succeeded; fails with the joined messages when all of them failed.
    pub async fn fetch_all(
        &self,
        sources: &[SourceDescriptor],
        default_query: Option<&QueryDescriptor>,
    ) -> Result<Vec<RawResult>, FetchError> {
        if sources.is_empty() {
            return Err(FetchError::NoSources);
        }

        let results = join_all(sources.iter().map(|source| self.fetch_one(source, default_query))).await;

        let failures: Vec<&str> = results.iter().filter_map(RawResult::error).collect();
        if failures.len() == results.len() {
            return Err(FetchError::AllSourcesFailed(failures.join("; ")));
        }
        if !failures.is_empty() {
            warn!(
                failed = failures.len(),
                total = results.len(),
                "Partial source failure, continuing with surviving sources"
            );
        }
        Ok(results)
    }

    /// Fetch one source, converting any failure into `RawResult::Failed`.
    pub async fn fetch_one(
        &self,
        source: &SourceDescriptor,
        default_query: Option<&QueryDescriptor>,
    ) -> RawResult {
        let query = source.query.as_ref().or(default_query);
        match self.try_fetch(source, query).await {
            Ok(payload) => {
                debug!(source = %source.label(), docs = payload.docs.len(), "Source fetched");
                RawResult::Fetched(payload)
            }
            Err(e) => {
                let label = source.label();
                warn!(source = %label, error = %e, "Source fetch failed");
                RawResult::Failed {
                    error: e.to_string(),
                    source: label,
                }
            }
        }
    }

    async fn try_fetch(
        &self,
        source: &SourceDescriptor,
        query: Option<&QueryDescriptor>,
    ) -> tessera_core::Result<SourcePayload> {
        let target = source
            .target()
            .ok_or_else(|| FetchError::MissingTarget(source.label()))?;

        match target {
            SourceTarget::Collection(collection) => {
                let query = query.cloned().unwrap_or_default();
                let result = self.store.find(collection, &query).await?;
                let raw = serde_json::to_value(&result)?;
                Ok(SourcePayload {
                    total_docs: Some(result.total_docs),
                    docs: result.docs,
                    raw,
                })
            }
            SourceTarget::Global(slug) => {
                let doc = self.store.find_global(slug, query.and_then(|q| q.depth)).await?;
                Ok(SourcePayload {
                    docs: docs_from(&doc),
                    total_docs: None,
                    raw: doc,
                })
            }
            SourceTarget::Endpoint(endpoint) => {
                let client = self
                    .endpoints
                    .as_ref()
                    .ok_or_else(|| FetchError::NoEndpointClient(endpoint.to_string()))?;
                let params = encode_endpoint_params(source.collection.as_deref(), query);
                let response = client.get(endpoint, &params).await?;
                if !response.success {
                    return Err(StoreError::Endpoint {
                        endpoint: endpoint.to_string(),
                        message: response
                            .error
                            .clone()
                            .unwrap_or_else(|| "request failed".to_string()),
                    }
                    .into());
                }
                let raw = serde_json::to_value(&response)?;
                Ok(SourcePayload {
                    docs: docs_from(&response.data),
                    total_docs: response.pagination.as_ref().map(|p| p.total_docs),
                    raw,
                })
            }
        }
    }
}
