//! Entry points: one-shot renders and mounted pages

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use tessera_api::RenderNode;
use tessera_core::{DocumentStore, EndpointClient};

use crate::config::EngineConfig;
use crate::data::DataFetcher;
use crate::error::TableError;
use crate::render::{render_blocks, MountRegistry, NodeState, RenderContext, RenderServices};
use crate::table::{QueryParams, TableAction};

/// Upper bound on re-render passes in [`PageMount::render_settled`]; nested
/// `dataFetch` nodes only start once their parent's data has landed.
const MAX_SETTLE_PASSES: usize = 32;

/// Renders block trees against a document store.
///
/// ```rust,ignore
/// let engine = BlockEngine::new(Arc::new(store)).with_config(EngineConfig::new());
/// let nodes = engine.render(&page["layout"].as_array().cloned().unwrap_or_default()).await;
/// ```
#[derive(Clone)]
pub struct BlockEngine {
    store: Arc<dyn DocumentStore>,
    endpoints: Option<Arc<dyn EndpointClient>>,
    config: EngineConfig,
}

impl BlockEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            endpoints: None,
            config: EngineConfig::default(),
        }
    }

    pub fn with_endpoints(mut self, client: Arc<dyn EndpointClient>) -> Self {
        self.endpoints = Some(client);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn services(&self) -> Arc<RenderServices> {
        let mut fetcher = DataFetcher::new(Arc::clone(&self.store));
        if let Some(endpoints) = &self.endpoints {
            fetcher = fetcher.with_endpoints(Arc::clone(endpoints));
        }
        Arc::new(RenderServices {
            store: Arc::clone(&self.store),
            fetcher,
            config: self.config.clone(),
        })
    }

    /// Render `blocks` once, awaiting every fetch inline.
    pub async fn render(&self, blocks: &[Value]) -> Vec<RenderNode> {
        self.render_with_query(blocks, "").await
    }

    /// Like [`render`](Self::render), with URL query parameters for tables
    /// that restore their state from the URL.
    pub async fn render_with_query(&self, blocks: &[Value], query: &str) -> Vec<RenderNode> {
        let ctx = RenderContext::new(self.services(), QueryParams::parse(query));
        render_blocks(blocks, &ctx).await
    }

    /// Mount `blocks` as a live page: fetches run in the background, refresh
    /// timers tick, and table state survives between renders.
    pub fn mount(&self, blocks: Vec<Value>, query: &str) -> PageMount {
        info!("[BlockEngine] Mounting page with {} top-level blocks", blocks.len());
        PageMount {
            blocks: Mutex::new(Arc::new(blocks)),
            registry: MountRegistry::new(self.services()),
            url: Mutex::new(QueryParams::parse(query)),
            pass: tokio::sync::Mutex::new(()),
        }
    }
}

/// A mounted page. Dropping it unmounts: refresh timers stop and results of
/// in-flight fetches are discarded.
pub struct PageMount {
    blocks: Mutex<Arc<Vec<Value>>>,
    registry: Arc<MountRegistry>,
    url: Mutex<QueryParams>,
    /// Serializes render passes so pruning sees one complete pass.
    pass: tokio::sync::Mutex<()>,
}

impl PageMount {
    /// Render the current state without waiting for pending fetches.
    pub async fn render(&self) -> Vec<RenderNode> {
        let _pass = self.pass.lock().await;
        let blocks = self.blocks.lock().clone();
        let url = self.url.lock().clone();
        let ctx = RenderContext::new(Arc::clone(self.registry.services()), url)
            .mounted(Arc::clone(&self.registry));

        self.registry.begin_pass();
        let nodes = render_blocks(&blocks, &ctx).await;
        self.registry.end_pass();
        nodes
    }

    /// Wait for every in-flight fetch cycle to land.
    pub async fn settled(&self) {
        self.registry.settled().await;
    }

    /// Render repeatedly until a pass starts no new fetch.
    pub async fn render_settled(&self) -> Vec<RenderNode> {
        let mut nodes = self.render().await;
        for pass in 1..MAX_SETTLE_PASSES {
            if self.registry.in_flight() == 0 {
                return nodes;
            }
            debug!(pass, in_flight = self.registry.in_flight(), "Waiting for fetches to settle");
            self.registry.settled().await;
            nodes = self.render().await;
        }
        warn!("Page did not settle after {MAX_SETTLE_PASSES} passes");
        nodes
    }

    /// Swap the block tree. Nodes whose configuration is unchanged at the same
    /// position keep their state; changed ones start over.
    pub fn replace_blocks(&self, blocks: Vec<Value>) {
        *self.blocks.lock() = Arc::new(blocks);
    }

    /// Apply a table action and, when the table syncs to the URL, rewrite the
    /// page's query string. The next render fetches the new page of rows.
    pub fn dispatch_table(&self, path: &str, action: TableAction) -> Result<bool, TableError> {
        let changed = self.registry.dispatch_table(path, action)?;
        if changed {
            let mut url = self.url.lock();
            if let Some(next) = self.registry.table_url_query(path, &url) {
                *url = next;
            }
        }
        Ok(changed)
    }

    pub fn url_query(&self) -> String {
        self.url.lock().to_query_string()
    }

    /// Paths of the tables reached by the last render, for [`dispatch_table`](Self::dispatch_table).
    pub fn table_paths(&self) -> Vec<String> {
        self.registry.table_paths()
    }

    pub fn node_state(&self, path: &str) -> Option<NodeState> {
        self.registry.node_state(path)
    }

    /// Refetch the `dataFetch` node at `path` now.
    pub fn refresh(&self, path: &str) -> bool {
        self.registry.refresh(path)
    }

    pub fn unmount(&self) {
        self.registry.unmount();
    }

    pub fn is_unmounted(&self) -> bool {
        self.registry.is_unmounted()
    }
}

impl Drop for PageMount {
    fn drop(&mut self) {
        self.registry.unmount();
    }
}
