//! Shared types for the tessera block engine
//!
//! - `block`: the closed set of block documents the dispatcher understands
//! - `query`: data source, query, merge and transform descriptors
//! - `envelope`: the `{data, loading, error, ...}` wrapper exposed through contexts
//! - `render`: the output tree produced by rendering a block list
//! - `value`: permissive helpers over `serde_json::Value`

pub mod block;
pub mod envelope;
pub mod query;
pub mod render;
pub mod value;

pub use block::{
    Block, BlockRefBlock, DataFetchBlock, DocRef, GridBlock, GridItem, HeadingBlock,
    RichTextBlock, SectionRefBlock, SelectionMode, SlotBlock, StatCardBlock, StatFormat,
    TableBlock, TableColumn, DEFAULT_DATA_KEY, ROW_DATA_KEY,
};
pub use envelope::Envelope;
pub use query::{
    ApiResponse, FindResult, MergeStrategy, Pagination, QueryDescriptor, SourceDescriptor,
    SourceKind, SourceTarget, TransformDescriptor, TransformKind,
};
pub use render::{GridCell, RenderNode, SortDirection, TableCell, TableRow, TableView, TableViewColumn};

pub use serde_json::{Map, Value};
