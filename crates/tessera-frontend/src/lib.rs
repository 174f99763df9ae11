//! Session layer for the tessera engine
//!
//! Wires a document store, an optional HTTP endpoint client and the engine
//! configuration into a [`FrontendSession`] that renders pages by slug.
//!
//! ```rust,ignore
//! use tessera_frontend::{FrontendConfig, FrontendSession};
//!
//! let config = FrontendConfig::new()
//!     .with_fixture("site.json".into())
//!     .with_endpoint_base_url("https://cms.example.com/api");
//!
//! let session = FrontendSession::new(config).await?;
//! let nodes = session.render_page("home", "orders.page=2").await?;
//! ```

pub mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info};

use tessera::{BlockEngine, EngineConfig, PageMount};
use tessera_api::{QueryDescriptor, RenderNode};
use tessera_core::{DocumentStore, HttpEndpointClient, InMemoryStore};

pub use tessera::TableAction;

/// Field of a page document holding its block tree.
const LAYOUT_FIELD: &str = "layout";

/// Configuration for a frontend session
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Base URL for `endpoint` data sources (None = endpoint sources fail)
    pub endpoint_base_url: Option<String>,
    /// JSON fixture loaded into an in-memory store (None = empty store)
    pub fixture: Option<PathBuf>,
    /// Collection pages are looked up in by `slug` (default: "pages")
    pub pages_collection: String,
    pub engine: EngineConfig,
    /// Tracing filter directive; overrides `RUST_LOG` when set
    pub log_filter: Option<String>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            endpoint_base_url: None,
            fixture: None,
            pages_collection: "pages".to_string(),
            engine: EngineConfig::default(),
            log_filter: None,
        }
    }
}

impl FrontendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from `TESSERA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();
        if let Some(url) = env_var("TESSERA_ENDPOINT_BASE_URL") {
            config = config.with_endpoint_base_url(url);
        }
        if let Some(path) = env_var("TESSERA_FIXTURE") {
            config = config.with_fixture(PathBuf::from(path));
        }
        if let Some(collection) = env_var("TESSERA_PAGES_COLLECTION") {
            config = config.with_pages_collection(collection);
        }
        if let Some(depth) = env_var("TESSERA_MAX_REFERENCE_DEPTH") {
            let depth = depth
                .parse()
                .with_context(|| format!("TESSERA_MAX_REFERENCE_DEPTH must be a number, got '{depth}'"))?;
            config.engine = config.engine.with_max_reference_depth(depth);
        }
        if let Some(limit) = env_var("TESSERA_DEFAULT_TABLE_LIMIT") {
            let limit = limit
                .parse()
                .with_context(|| format!("TESSERA_DEFAULT_TABLE_LIMIT must be a number, got '{limit}'"))?;
            config.engine = config.engine.with_default_table_limit(limit);
        }
        if let Some(filter) = env_var("TESSERA_LOG") {
            config = config.with_log_filter(filter);
        }
        Ok(config)
    }

    pub fn with_endpoint_base_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_base_url = Some(url.into());
        self
    }

    pub fn with_fixture(mut self, path: PathBuf) -> Self {
        self.fixture = Some(path);
        self
    }

    pub fn with_pages_collection(mut self, collection: impl Into<String>) -> Self {
        self.pages_collection = collection.into();
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Renders pages stored in a document store.
pub struct FrontendSession {
    engine: BlockEngine,
    store: Arc<dyn DocumentStore>,
    pages_collection: String,
}

impl FrontendSession {
    /// Build a session from `config`, loading the fixture if one is configured.
    pub async fn new(config: FrontendConfig) -> Result<Self> {
        let store = match &config.fixture {
            Some(path) => {
                let store = load_fixture(path).await?;
                info!(
                    "[FrontendSession] Loaded fixture {} ({} collections)",
                    path.display(),
                    store.collection_names().await.len()
                );
                store
            }
            None => InMemoryStore::new(),
        };
        Self::with_store(Arc::new(store), config)
    }

    /// Build a session over an existing store.
    pub fn with_store(store: Arc<dyn DocumentStore>, config: FrontendConfig) -> Result<Self> {
        let mut engine = BlockEngine::new(Arc::clone(&store)).with_config(config.engine);
        if let Some(base) = &config.endpoint_base_url {
            let client = HttpEndpointClient::new(base)
                .with_context(|| format!("Invalid endpoint base URL '{base}'"))?;
            engine = engine.with_endpoints(Arc::new(client));
        }
        Ok(Self {
            engine,
            store,
            pages_collection: config.pages_collection,
        })
    }

    pub fn engine(&self) -> &BlockEngine {
        &self.engine
    }

    /// Look up the page document with the given slug.
    pub async fn find_page(&self, slug: &str) -> Result<Value> {
        let query = QueryDescriptor::new()
            .with_where(json!({"slug": {"equals": slug}}))
            .with_limit(1);
        let result = self
            .store
            .find(&self.pages_collection, &query)
            .await
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("Failed to query '{}'", self.pages_collection))?;
        match result.docs.into_iter().next() {
            Some(page) => Ok(page),
            None => bail!("No page with slug '{slug}' in '{}'", self.pages_collection),
        }
    }

    /// Render a page once, awaiting all of its data.
    pub async fn render_page(&self, slug: &str, query: &str) -> Result<Vec<RenderNode>> {
        let layout = self.page_layout(slug).await?;
        debug!(slug, blocks = layout.len(), "Rendering page");
        Ok(self.engine.render_with_query(&layout, query).await)
    }

    /// Mount a page for live rendering.
    pub async fn mount_page(&self, slug: &str, query: &str) -> Result<PageMount> {
        let layout = self.page_layout(slug).await?;
        Ok(self.engine.mount(layout, query))
    }

    async fn page_layout(&self, slug: &str) -> Result<Vec<Value>> {
        let page = self.find_page(slug).await?;
        match page.get(LAYOUT_FIELD) {
            Some(Value::Array(blocks)) => Ok(blocks.clone()),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(other) => bail!("Page '{slug}' has a non-array layout: {other}"),
        }
    }
}

async fn load_fixture(path: &Path) -> Result<InMemoryStore> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let fixture: Value = serde_json::from_str(&text)
        .with_context(|| format!("Fixture {} is not valid JSON", path.display()))?;
    InMemoryStore::from_fixture(&fixture)
        .with_context(|| format!("Fixture {} has an unexpected shape", path.display()))
}
