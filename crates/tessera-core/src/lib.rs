//! Collaborators for the tessera block engine
//!
//! Defines the `DocumentStore` and `EndpointClient` traits the engine reads
//! through, plus the built-in implementations: an in-memory store with a
//! small query evaluator, and a reqwest-backed endpoint client.

pub mod error;
pub mod http;
pub mod memory_store;
pub mod query_engine;
pub mod traits;

pub use error::StoreError;
pub use http::{encode_endpoint_params, HttpEndpointClient};
pub use memory_store::InMemoryStore;
pub use query_engine::{execute_query, matches_where, sort_docs, DEFAULT_LIMIT};
pub use traits::{DocumentStore, EndpointClient, Result};
