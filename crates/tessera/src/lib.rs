//! Block composition and data-binding engine
//!
//! Pages are trees of JSON block documents. The engine walks a tree,
//! dispatches each block to its builder, and produces a [`RenderNode`] tree.
//! `dataFetch` blocks fetch from one or more sources, merge and transform the
//! results, and publish them to their descendants through a [`DataContext`];
//! `blockRef` / `sectionRef` pull in stored block documents with props and
//! slots substituted; tables drive their own paged queries.
//!
//! ```rust,ignore
//! use tessera::{BlockEngine, EngineConfig};
//! use tessera_core::InMemoryStore;
//!
//! let store = InMemoryStore::from_fixture(&fixture)?;
//! let engine = BlockEngine::new(Arc::new(store));
//!
//! // one-shot
//! let nodes = engine.render(&blocks).await;
//!
//! // live: background fetches, refresh timers, table state
//! let page = engine.mount(blocks, "orders.page=2");
//! let nodes = page.render_settled().await;
//! ```
//!
//! [`RenderNode`]: tessera_api::RenderNode

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod props;
pub mod render;
pub mod table;
pub mod template;
pub mod testing;

pub use config::EngineConfig;
pub use data::{DataContext, DataFetcher, FetchPlan};
pub use engine::{BlockEngine, PageMount};
pub use error::{FetchError, RenderError, TableError};
pub use render::{MountRegistry, NodeState, RenderContext};
pub use table::{QueryParams, TableAction, TableController, TableState};
pub use template::interpolate;
