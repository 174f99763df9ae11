/// Errors raised by the built-in collaborators (in-memory store, HTTP endpoints,
/// query evaluation).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Unknown global: {0}")]
    UnknownGlobal(String),

    #[error("Document '{id}' not found in '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),

    #[error("Endpoint '{endpoint}' failed: {message}")]
    Endpoint { endpoint: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}
