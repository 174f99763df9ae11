use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::{MergeStrategy, QueryDescriptor, SourceDescriptor, TransformDescriptor};
use crate::value::js_string;

/// Discriminant field present on every block document.
pub const BLOCK_TYPE_FIELD: &str = "blockType";

/// Context key under which `dataFetch` results land when no `dataKey` is set.
pub const DEFAULT_DATA_KEY: &str = "data";

/// Context key under which a `blocksTable` row is exposed to its cell blocks.
pub const ROW_DATA_KEY: &str = "row";

/// Known `blockType` tags.
pub mod tags {
    pub const HEADING: &str = "heading";
    pub const RICH_TEXT: &str = "richText";
    pub const STAT_CARD: &str = "statCard";
    pub const GRID: &str = "grid";
    pub const DATA_FETCH: &str = "dataFetch";
    pub const BLOCK_REF: &str = "blockRef";
    pub const SECTION_REF: &str = "sectionRef";
    pub const BLOCKS_TABLE: &str = "blocksTable";
    pub const TABLE: &str = "table";
    pub const SLOT: &str = "slot";
}

// =============================================================================
// Block - closed tagged union over blockType
// =============================================================================

/// A block node, parsed from its JSON document.
///
/// Nested block arrays stay as raw JSON (`Vec<Value>`) because the prop/slot
/// processor operates on the untyped structure; they are parsed lazily when
/// the dispatcher reaches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(HeadingBlock),
    RichText(RichTextBlock),
    StatCard(StatCardBlock),
    Grid(GridBlock),
    DataFetch(DataFetchBlock),
    BlockRef(BlockRefBlock),
    SectionRef(SectionRefBlock),
    BlocksTable(TableBlock),
    Table(TableBlock),
    Slot(SlotBlock),
    /// A well-formed block whose tag is not in the known set.
    Unknown { block_type: String },
    /// A document that is not a valid block: not an object, no `blockType`,
    /// or fields that do not fit the declared tag.
    Invalid { block_type: String, reason: String },
}

impl Block {
    /// Parse a block document. Never fails: bad input becomes `Unknown` or `Invalid`.
    pub fn parse(value: &Value) -> Block {
        let Some(object) = value.as_object() else {
            return Block::Invalid {
                block_type: String::new(),
                reason: "block is not an object".to_string(),
            };
        };
        let Some(block_type) = object.get(BLOCK_TYPE_FIELD).and_then(Value::as_str) else {
            return Block::Invalid {
                block_type: String::new(),
                reason: format!("missing `{BLOCK_TYPE_FIELD}`"),
            };
        };

        match block_type {
            tags::HEADING => typed(value, block_type, Block::Heading),
            tags::RICH_TEXT => typed(value, block_type, Block::RichText),
            tags::STAT_CARD => typed(value, block_type, Block::StatCard),
            tags::GRID => typed(value, block_type, Block::Grid),
            tags::DATA_FETCH => typed(value, block_type, Block::DataFetch),
            tags::BLOCK_REF => typed(value, block_type, Block::BlockRef),
            tags::SECTION_REF => typed(value, block_type, Block::SectionRef),
            tags::BLOCKS_TABLE => typed(value, block_type, Block::BlocksTable),
            tags::TABLE => typed(value, block_type, Block::Table),
            tags::SLOT => typed(value, block_type, Block::Slot),
            other => Block::Unknown {
                block_type: other.to_string(),
            },
        }
    }

    pub fn block_type(&self) -> &str {
        match self {
            Block::Heading(_) => tags::HEADING,
            Block::RichText(_) => tags::RICH_TEXT,
            Block::StatCard(_) => tags::STAT_CARD,
            Block::Grid(_) => tags::GRID,
            Block::DataFetch(_) => tags::DATA_FETCH,
            Block::BlockRef(_) => tags::BLOCK_REF,
            Block::SectionRef(_) => tags::SECTION_REF,
            Block::BlocksTable(_) => tags::BLOCKS_TABLE,
            Block::Table(_) => tags::TABLE,
            Block::Slot(_) => tags::SLOT,
            Block::Unknown { block_type } | Block::Invalid { block_type, .. } => block_type,
        }
    }
}

fn typed<T: DeserializeOwned>(value: &Value, block_type: &str, wrap: impl FnOnce(T) -> Block) -> Block {
    match T::deserialize(value) {
        Ok(block) => wrap(block),
        Err(e) => Block::Invalid {
            block_type: block_type.to_string(),
            reason: e.to_string(),
        },
    }
}

/// True when `value` is a block document tagged `slot`.
pub fn is_slot(value: &Value) -> bool {
    value.get(BLOCK_TYPE_FIELD).and_then(Value::as_str) == Some(tags::SLOT)
}

// =============================================================================
// Leaf blocks
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingBlock {
    pub text: String,
    #[serde(default = "default_heading_level")]
    pub level: u8,
}

fn default_heading_level() -> u8 {
    2
}

/// Structured rich-text document; rendering it is the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTextBlock {
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatFormat {
    #[default]
    Number,
    Currency,
    Percent,
    Raw,
}

/// A single headline figure, usually bound to a `dataFetch` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatCardBlock {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Literal value; bypasses the data context when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default)]
    pub format: StatFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

// =============================================================================
// Container blocks
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(default)]
    pub items: Vec<GridItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<u32>,
    #[serde(default)]
    pub content: Vec<Value>,
}

/// Fetches data from one or more sources and exposes it to its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFetchBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_key: Option<String>,
    /// Deprecated single-source form; `sources` wins when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceDescriptor>,
    #[serde(default)]
    pub sources: Vec<SourceDescriptor>,
    /// Query shared by every source that has no override of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryDescriptor>,
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
    #[serde(default)]
    pub transform: TransformDescriptor,
    /// Re-fetch period in seconds; `None` or `0` disables refreshing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,
    #[serde(default)]
    pub children: Vec<Value>,
}

impl DataFetchBlock {
    pub fn data_key(&self) -> &str {
        self.data_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .unwrap_or(DEFAULT_DATA_KEY)
    }

    /// The sources to fetch: `sources` when non-empty, else the legacy `source`.
    pub fn effective_sources(&self) -> Vec<SourceDescriptor> {
        if !self.sources.is_empty() {
            self.sources.clone()
        } else {
            self.source.iter().cloned().collect()
        }
    }
}

/// A reference to a stored document: its id, or the populated document itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocRef {
    Id(String),
    NumericId(i64),
    Populated(Map<String, Value>),
}

impl DocRef {
    pub fn id(&self) -> Option<String> {
        match self {
            DocRef::Id(id) => Some(id.clone()),
            DocRef::NumericId(id) => Some(id.to_string()),
            DocRef::Populated(doc) => doc.get("id").map(js_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRefBlock {
    pub block: DocRef,
    #[serde(default)]
    pub props: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRefBlock {
    pub section: DocRef,
    #[serde(default)]
    pub props: Map<String, Value>,
}

/// Named insertion point inside a reusable block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotBlock {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_blocks: Option<Vec<Value>>,
}

// =============================================================================
// Tables
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    None,
    Single,
    Multi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default)]
    pub hidden: bool,
    /// Cell template for `blocksTable`, rendered once per row.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cell: Vec<Value>,
}

fn default_true() -> bool {
    true
}

impl TableColumn {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.field)
    }
}

/// Configuration shared by `table` and `blocksTable`.
///
/// A table either reads rows from the data context (`useExternalData` or a
/// `dataKey`) or runs its own fetch against `collection`, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_key: Option<String>,
    #[serde(default)]
    pub use_external_data: bool,
    #[serde(default)]
    pub columns: Vec<TableColumn>,
    /// Base query merged under the table's own filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<u64>,
    #[serde(default)]
    pub sync_url: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_group: Option<String>,
    #[serde(default)]
    pub selection: SelectionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_selection: Option<usize>,
    /// Dimension driven by the status tabs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_field: Option<String>,
    /// Field the date-range filter applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_field: Option<String>,
    #[serde(default)]
    pub search_fields: Vec<String>,
    /// Field identifying a row for selection; defaults to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_key: Option<String>,
}

impl TableBlock {
    /// The context key to read rows from, when this table is context-fed.
    pub fn context_key(&self) -> Option<&str> {
        let key = self.data_key.as_deref().filter(|k| !k.is_empty());
        if self.use_external_data {
            Some(key.unwrap_or(DEFAULT_DATA_KEY))
        } else {
            key
        }
    }

    pub fn row_key(&self) -> &str {
        self.row_key.as_deref().unwrap_or("id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_blocks() {
        let heading = Block::parse(&json!({"blockType": "heading", "text": "Hi"}));
        assert_eq!(
            heading,
            Block::Heading(HeadingBlock {
                text: "Hi".into(),
                level: 2
            })
        );

        let grid = Block::parse(&json!({
            "blockType": "grid",
            "items": [{"content": [{"blockType": "heading", "text": "a"}]}, {"span": 2}]
        }));
        match grid {
            Block::Grid(g) => {
                assert_eq!(g.items.len(), 2);
                assert_eq!(g.items[0].content.len(), 1);
                assert_eq!(g.items[1].span, Some(2));
            }
            other => panic!("expected grid, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_and_invalid() {
        assert_eq!(
            Block::parse(&json!({"blockType": "carousel"})),
            Block::Unknown {
                block_type: "carousel".into()
            }
        );
        assert!(matches!(
            Block::parse(&json!({"text": "no tag"})),
            Block::Invalid { .. }
        ));
        assert!(matches!(Block::parse(&json!("heading")), Block::Invalid { .. }));
        match Block::parse(&json!({"blockType": "heading", "level": 1})) {
            Block::Invalid { block_type, reason } => {
                assert_eq!(block_type, "heading");
                assert!(reason.contains("text"), "reason: {reason}");
            }
            other => panic!("expected invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_data_fetch_prefers_sources_array() {
        let block: DataFetchBlock = serde_json::from_value(json!({
            "source": {"type": "collection", "collection": "legacy"},
            "sources": [{"type": "collection", "collection": "current"}]
        }))
        .unwrap();
        let sources = block.effective_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].collection.as_deref(), Some("current"));
        assert_eq!(block.data_key(), DEFAULT_DATA_KEY);

        let legacy: DataFetchBlock = serde_json::from_value(json!({
            "source": {"type": "global", "global": "site"}
        }))
        .unwrap();
        assert_eq!(legacy.effective_sources()[0].global.as_deref(), Some("site"));
    }

    #[test]
    fn test_doc_ref_variants() {
        let by_id: BlockRefBlock = serde_json::from_value(json!({"block": "abc"})).unwrap();
        assert_eq!(by_id.block.id().as_deref(), Some("abc"));
        let numeric: BlockRefBlock = serde_json::from_value(json!({"block": 7})).unwrap();
        assert_eq!(numeric.block.id().as_deref(), Some("7"));
        let populated: SectionRefBlock =
            serde_json::from_value(json!({"section": {"id": "s1", "blocks": []}})).unwrap();
        assert!(matches!(populated.section, DocRef::Populated(_)));
    }

    #[test]
    fn test_table_context_key() {
        let table: TableBlock = serde_json::from_value(json!({"useExternalData": true})).unwrap();
        assert_eq!(table.context_key(), Some(DEFAULT_DATA_KEY));
        let keyed: TableBlock = serde_json::from_value(json!({"dataKey": "orders"})).unwrap();
        assert_eq!(keyed.context_key(), Some("orders"));
        let own: TableBlock = serde_json::from_value(json!({"collection": "orders"})).unwrap();
        assert_eq!(own.context_key(), None);
        assert_eq!(own.row_key(), "id");
    }
}
