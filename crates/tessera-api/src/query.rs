//! Data source, query and transform descriptors
//!
//! These are the declarative pieces a `dataFetch` block carries. They are
//! deserialized straight from block JSON, so field names follow the
//! camelCase convention of the stored documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which kind of collaborator a source reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Collection,
    Global,
    Endpoint,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Collection => write!(f, "collection"),
            SourceKind::Global => write!(f, "global"),
            SourceKind::Endpoint => write!(f, "endpoint"),
        }
    }
}

/// One data source of a `dataFetch` block.
///
/// Exactly one of `collection` / `global` / `endpoint` is meaningful, chosen
/// by `kind`. For endpoint sources `collection` is forwarded as a query
/// parameter when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryDescriptor>,
}

/// The resolved target of a source descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTarget<'a> {
    Collection(&'a str),
    Global(&'a str),
    Endpoint(&'a str),
}

impl SourceDescriptor {
    fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            collection: None,
            global: None,
            endpoint: None,
            data_key: None,
            query: None,
        }
    }

    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: Some(name.into()),
            ..Self::new(SourceKind::Collection)
        }
    }

    pub fn global(slug: impl Into<String>) -> Self {
        Self {
            global: Some(slug.into()),
            ..Self::new(SourceKind::Global)
        }
    }

    pub fn endpoint(path: impl Into<String>) -> Self {
        Self {
            endpoint: Some(path.into()),
            ..Self::new(SourceKind::Endpoint)
        }
    }

    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn with_query(mut self, query: QueryDescriptor) -> Self {
        self.query = Some(query);
        self
    }

    /// The field selected by `kind`, or `None` when it is missing or empty.
    pub fn target(&self) -> Option<SourceTarget<'_>> {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|s| !s.is_empty())
        }
        match self.kind {
            SourceKind::Collection => non_empty(&self.collection).map(SourceTarget::Collection),
            SourceKind::Global => non_empty(&self.global).map(SourceTarget::Global),
            SourceKind::Endpoint => non_empty(&self.endpoint).map(SourceTarget::Endpoint),
        }
    }

    /// Human-readable label used in error messages (`"collection:users"`).
    pub fn label(&self) -> String {
        match self.target() {
            Some(SourceTarget::Collection(name)) => format!("collection:{name}"),
            Some(SourceTarget::Global(slug)) => format!("global:{slug}"),
            Some(SourceTarget::Endpoint(path)) => format!("endpoint:{path}"),
            None => format!("{}:<unset>", self.kind),
        }
    }
}

/// Filter / sort / pagination / population contract handed to the store.
///
/// Every field is optional and omitted when unset so that collaborator
/// defaults are never overridden by empty values. `limit = Some(0)` means
/// "no page cap".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub populate: Option<Vec<String>>,
}

impl QueryDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_where(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_search<I, S>(mut self, term: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search = Some(term.into());
        self.search_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// How multiple source results are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Concatenate every source's documents into one list.
    #[default]
    Union,
    /// Keep each source addressable under its own key.
    Separate,
}

/// Aggregation applied to a document list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformKind {
    #[default]
    None,
    Count,
    Sum,
    Average,
    First,
    Last,
    GroupBy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformDescriptor {
    #[serde(rename = "type", default)]
    pub kind: TransformKind,
    /// Dot path into each record; required by `sum`, `average` and `groupBy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl TransformDescriptor {
    pub fn new(kind: TransformKind) -> Self {
        Self { kind, field: None }
    }

    pub fn on(kind: TransformKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: Some(field.into()),
        }
    }
}

/// Result of a collection query against the document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindResult {
    pub docs: Vec<Value>,
    pub total_docs: u64,
    pub page: u64,
    pub total_pages: u64,
    /// Page size that was applied; `0` when the query was uncapped.
    #[serde(default)]
    pub limit: u64,
}

impl FindResult {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit, self.total_docs)
    }
}

/// Pagination metadata, as reported by endpoints and emitted in table views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default, alias = "total")]
    pub total_docs: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_prev_page: bool,
}

impl Pagination {
    /// Derive page counts from a page, a page size (`0` = uncapped) and a total.
    pub fn new(page: u64, limit: u64, total_docs: u64) -> Self {
        let page = page.max(1);
        let total_pages = if limit == 0 {
            1
        } else {
            total_docs.div_ceil(limit).max(1)
        };
        Self {
            page,
            limit,
            total_docs,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// Response envelope returned by HTTP data endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
