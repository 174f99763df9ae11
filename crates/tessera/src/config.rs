use tessera_api::DEFAULT_DATA_KEY;

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum `blockRef` / `sectionRef` nesting before rendering an error.
    pub max_reference_depth: usize,
    /// Collection holding reusable blocks referenced by `blockRef`.
    pub blocks_collection: String,
    /// Collection holding sections referenced by `sectionRef`.
    pub sections_collection: String,
    /// Page size for tables that do not configure `defaultLimit`.
    pub default_table_limit: u64,
    /// Context key used by `dataFetch` and `statCard` when `dataKey` is unset.
    pub default_data_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_reference_depth: 10,
            blocks_collection: "blocks".to_string(),
            sections_collection: "sections".to_string(),
            default_table_limit: 10,
            default_data_key: DEFAULT_DATA_KEY.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_reference_depth(mut self, depth: usize) -> Self {
        self.max_reference_depth = depth;
        self
    }

    pub fn with_blocks_collection(mut self, collection: impl Into<String>) -> Self {
        self.blocks_collection = collection.into();
        self
    }

    pub fn with_sections_collection(mut self, collection: impl Into<String>) -> Self {
        self.sections_collection = collection.into();
        self
    }

    pub fn with_default_table_limit(mut self, limit: u64) -> Self {
        self.default_table_limit = limit;
        self
    }

    pub fn with_default_data_key(mut self, key: impl Into<String>) -> Self {
        self.default_data_key = key.into();
        self
    }

    /// `key` when set and non-empty, otherwise the configured default.
    pub fn data_key_or_default<'a>(&'a self, key: Option<&'a str>) -> &'a str {
        key.filter(|k| !k.is_empty())
            .unwrap_or(self.default_data_key.as_str())
    }
}
