//! Render output tree
//!
//! `RenderNode` is what the dispatcher produces for every block. It is a
//! serializable description of the page, not a drawn UI: a frontend walks
//! it and maps each node to its own widgets.

use serde::Serialize;
use serde_json::Value;

use crate::query::Pagination;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum RenderNode {
    Heading {
        level: u8,
        text: String,
    },
    RichText {
        document: Value,
    },
    #[serde(rename_all = "camelCase")]
    Stat {
        label: String,
        display: String,
        value: Value,
        loading: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Grid {
        columns: u32,
        cells: Vec<GridCell>,
    },
    /// Output of a `dataFetch` node: its children rendered with the keys it added.
    #[serde(rename_all = "camelCase")]
    DataScope {
        data_key: String,
        keys: Vec<String>,
        children: Vec<RenderNode>,
    },
    /// Output of a `blockRef` / `sectionRef`.
    #[serde(rename_all = "camelCase")]
    Reference {
        block_type: String,
        id: String,
        children: Vec<RenderNode>,
    },
    Fragment {
        children: Vec<RenderNode>,
    },
    Table(TableView),
    #[serde(rename_all = "camelCase")]
    Loading {
        block_type: String,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        block_type: String,
        message: String,
    },
    Unknown {
        #[serde(rename = "unknown block type")]
        block_type: String,
    },
    #[serde(rename_all = "camelCase")]
    Invalid {
        block_type: String,
        reason: String,
    },
}

impl RenderNode {
    pub fn children(&self) -> &[RenderNode] {
        match self {
            RenderNode::DataScope { children, .. }
            | RenderNode::Reference { children, .. }
            | RenderNode::Fragment { children } => children,
            _ => &[],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            RenderNode::Loading { .. }
                | RenderNode::Error { .. }
                | RenderNode::Unknown { .. }
                | RenderNode::Invalid { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub span: u32,
    pub children: Vec<RenderNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub block_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub columns: Vec<TableViewColumn>,
    pub rows: Vec<TableRow>,
    pub pagination: Pagination,
    pub status_tab: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub search: String,
    /// Serialized URL query when the table syncs its state to the URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_query: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableViewColumn {
    pub field: String,
    pub label: String,
    pub sortable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorted: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub key: String,
    pub selected: bool,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "camelCase")]
pub enum TableCell {
    Value(Value),
    Blocks(Vec<RenderNode>),
}
