//! Collaborator traits
//!
//! The engine never assumes a storage technology. Everything it reads goes
//! through `DocumentStore` (collections and globals) or `EndpointClient`
//! (HTTP data endpoints returning an `ApiResponse` envelope).

use async_trait::async_trait;
use serde_json::Value;

use tessera_api::{ApiResponse, FindResult, QueryDescriptor};

// Boxed error so implementors can surface whatever their backend raises
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Conventional document store: collections of JSON documents plus singleton globals.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Query a collection. Unset query fields fall back to store defaults.
    async fn find(&self, collection: &str, query: &QueryDescriptor) -> Result<FindResult>;

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        depth: Option<u32>,
    ) -> Result<Option<Value>>;

    /// Read a singleton global document by slug.
    async fn find_global(&self, slug: &str, depth: Option<u32>) -> Result<Value>;

    /// Create a document, returning it with its assigned id.
    async fn create(&self, collection: &str, data: Value) -> Result<Value>;

    /// Shallow-merge `data` into an existing document.
    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<Value>;

    /// Delete a document, returning it if it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Value>>;
}

/// Client for HTTP data endpoints.
///
/// `params` are plain query-string pairs as produced by
/// [`encode_endpoint_params`](crate::encode_endpoint_params).
#[async_trait]
pub trait EndpointClient: Send + Sync {
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<ApiResponse>;
}
