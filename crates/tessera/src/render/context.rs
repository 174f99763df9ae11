use std::fmt::Display;
use std::sync::Arc;

use tessera_core::DocumentStore;

use crate::config::EngineConfig;
use crate::data::{DataContext, DataFetcher};
use crate::table::QueryParams;

use super::mount::MountRegistry;

/// Collaborators shared by every node of a render pass.
pub struct RenderServices {
    pub store: Arc<dyn DocumentStore>,
    pub fetcher: DataFetcher,
    pub config: EngineConfig,
}

/// Context passed down the block tree during a render.
///
/// Cheap to clone: everything heavy is behind an `Arc`. Child contexts are
/// derived with the builder methods; a node never modifies its parent's.
#[derive(Clone)]
pub struct RenderContext {
    /// Entries published by enclosing `dataFetch` nodes.
    pub data: DataContext,
    pub services: Arc<RenderServices>,
    /// Set for mounted renders; `dataFetch` and tables keep their state here.
    pub mount: Option<Arc<MountRegistry>>,
    /// Position of the current node in the tree (`"0/children/2"`).
    pub path: String,
    /// `blockRef` / `sectionRef` nesting depth, for cycle protection.
    pub reference_depth: usize,
    pub url_query: Arc<QueryParams>,
}

impl RenderContext {
    pub fn new(services: Arc<RenderServices>, url_query: QueryParams) -> Self {
        Self {
            data: DataContext::new(),
            services,
            mount: None,
            path: String::new(),
            reference_depth: 0,
            url_query: Arc::new(url_query),
        }
    }

    pub fn mounted(mut self, registry: Arc<MountRegistry>) -> Self {
        self.mount = Some(registry);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.services.config
    }

    /// Child context one path segment further down.
    pub fn at(&self, segment: impl Display) -> Self {
        let path = if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}/{}", self.path, segment)
        };
        Self {
            path,
            ..self.clone()
        }
    }

    pub fn with_data(&self, data: DataContext) -> Self {
        Self {
            data,
            ..self.clone()
        }
    }

    pub fn deeper_reference(&self) -> Self {
        Self {
            reference_depth: self.reference_depth + 1,
            ..self.clone()
        }
    }
}
