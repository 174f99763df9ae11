/// Failures of a `dataFetch` cycle as a whole.
///
/// Individual source failures never surface here; they are recorded per
/// source and only become `AllSourcesFailed` when nothing succeeded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("no data sources configured")]
    NoSources,

    #[error("data source `{0}` has no target")]
    MissingTarget(String),

    #[error("no endpoint client configured for `{0}`")]
    NoEndpointClient(String),

    /// Every source errored; carries the messages joined with `"; "`.
    #[error("{0}")]
    AllSourcesFailed(String),
}

/// Errors raised while rendering one block. The dispatcher turns them into
/// an `Error` placeholder for that block only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("reference recursion limit reached (depth {0})")]
    ReferenceDepthExceeded(usize),

    #[error("reference has no id")]
    MissingReference,

    #[error("'{id}' not found in '{collection}'")]
    ReferenceNotFound { collection: String, id: String },

    #[error("table has neither a data key nor a collection")]
    TableWithoutSource,

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Rejected table state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("page must be at least 1")]
    InvalidPage,

    #[error("limit must be at least 1")]
    InvalidLimit,

    #[error("row selection is disabled for this table")]
    SelectionDisabled,

    #[error("selection limit of {max} rows reached")]
    SelectionLimit { max: usize },

    #[error("date range starts after it ends")]
    InvertedDateRange,

    #[error("no table mounted at '{0}'")]
    UnknownTable(String),
}
