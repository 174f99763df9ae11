//! Fetch → merge → context pipeline of `dataFetch` nodes

pub mod context;
pub mod fetcher;
pub mod merge;

use std::time::Duration;

use indexmap::IndexMap;
use tracing::debug;

use tessera_api::{
    DataFetchBlock, Envelope, MergeStrategy, QueryDescriptor, SourceDescriptor,
    TransformDescriptor,
};

use crate::error::FetchError;

pub use context::DataContext;
pub use fetcher::{DataFetcher, RawResult, SourcePayload};
pub use merge::{apply_transform, merge};

/// Everything needed to run one fetch cycle of a `dataFetch` node.
///
/// Two plans compare equal exactly when they would fetch and merge the same
/// way, which is how mounted nodes detect a changed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    pub data_key: String,
    pub sources: Vec<SourceDescriptor>,
    pub query: Option<QueryDescriptor>,
    pub strategy: MergeStrategy,
    pub transform: TransformDescriptor,
    pub refresh: Option<Duration>,
}

impl FetchPlan {
    pub fn from_block(block: &DataFetchBlock, default_data_key: &str) -> Self {
        if block.source.is_some() && !block.sources.is_empty() {
            debug!("dataFetch declares both `source` and `sources`; using `sources`");
        }
        Self {
            data_key: block
                .data_key
                .clone()
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| default_data_key.to_string()),
            sources: block.effective_sources(),
            query: block.query.clone(),
            strategy: block.merge_strategy,
            transform: block.transform.clone(),
            refresh: block
                .refresh_interval
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Fetch every source and merge the results into context entries.
    pub async fn run(&self, fetcher: &DataFetcher) -> Result<IndexMap<String, Envelope>, FetchError> {
        let results = fetcher.fetch_all(&self.sources, self.query.as_ref()).await?;
        Ok(merge(
            &results,
            &self.sources,
            self.strategy,
            &self.transform,
            &self.data_key,
        ))
    }
}
