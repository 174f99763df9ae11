//! Table state ⇄ URL query parameters

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use tracing::warn;

use super::query_params::QueryParams;
use super::state::{ColumnSort, DateRange, TableState, ALL_TAB};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Converts a state type to and from query parameters.
///
/// `decode` yields a partial state: only what the parameters mention.
pub trait StateCodec<T> {
    type Partial;

    fn encode(&self, state: &T) -> Vec<(String, String)>;

    fn decode(&self, params: &QueryParams) -> Self::Partial;
}

/// The subset of table state present in a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStatePatch {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sorting: Option<Vec<ColumnSort>>,
    pub column_filters: Option<IndexMap<String, IndexSet<String>>>,
    pub column_visibility: Option<IndexMap<String, bool>>,
    pub global_filter: Option<String>,
    pub status_tab: Option<String>,
    pub date_range: Option<DateRange>,
}

impl TableStatePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(self, state: &mut TableState) {
        if let Some(page) = self.page {
            state.page = page;
        }
        if let Some(limit) = self.limit {
            state.limit = limit;
        }
        if let Some(sorting) = self.sorting {
            state.sorting = sorting;
        }
        if let Some(filters) = self.column_filters {
            state.column_filters = filters;
        }
        if let Some(visibility) = self.column_visibility {
            state.column_visibility = visibility;
        }
        if let Some(search) = self.global_filter {
            state.global_filter = search;
        }
        if let Some(tab) = self.status_tab {
            state.status_tab = tab;
        }
        if let Some(range) = self.date_range {
            state.date_range = range;
        }
    }
}

/// URL codec for [`TableState`], optionally namespaced by a `urlGroup`.
///
/// Only values that differ from the defaults are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUrlCodec {
    group: Option<String>,
    default_limit: u64,
}

impl TableUrlCodec {
    pub fn new(group: Option<String>, default_limit: u64) -> Self {
        Self {
            group: group.filter(|g| !g.is_empty()),
            default_limit,
        }
    }

    fn key(&self, name: &str) -> String {
        match &self.group {
            Some(group) => format!("{group}.{name}"),
            None => name.to_string(),
        }
    }

    fn local<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.group {
            Some(group) => key.strip_prefix(group.as_str())?.strip_prefix('.'),
            None => Some(key),
        }
    }

    /// Whether `key` is one this codec writes.
    pub fn owns(&self, key: &str) -> bool {
        let Some(local) = self.local(key) else {
            return false;
        };
        matches!(
            local,
            "page" | "limit" | "search" | "statusTab" | "sort" | "columnVisibility"
        ) || local.starts_with("filters[")
            || local.starts_with("dateRange[")
    }

    /// Replace this table's keys in `params` with the encoding of `state`,
    /// leaving every other key untouched.
    pub fn write(&self, state: &TableState, params: &QueryParams) -> QueryParams {
        let mut next = params.clone();
        next.retain(|key, _| !self.owns(key));
        next.extend(self.encode(state));
        next
    }
}

impl StateCodec<TableState> for TableUrlCodec {
    type Partial = TableStatePatch;

    fn encode(&self, state: &TableState) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if state.page != 1 {
            pairs.push((self.key("page"), state.page.to_string()));
        }
        if state.limit != self.default_limit {
            pairs.push((self.key("limit"), state.limit.to_string()));
        }
        if !state.global_filter.is_empty() {
            pairs.push((self.key("search"), state.global_filter.clone()));
        }
        if state.status_tab != ALL_TAB {
            pairs.push((self.key("statusTab"), state.status_tab.clone()));
        }
        if !state.sorting.is_empty() {
            let sort: Vec<String> = state.sorting.iter().map(ColumnSort::to_sort_key).collect();
            pairs.push((self.key("sort"), sort.join(",")));
        }
        for (dimension, values) in &state.column_filters {
            let key = self.key(&format!("filters[{dimension}][]"));
            for value in values {
                pairs.push((key.clone(), value.clone()));
            }
        }
        if let Some(from) = state.date_range.from {
            pairs.push((self.key("dateRange[from]"), from.format(DATE_FORMAT).to_string()));
        }
        if let Some(to) = state.date_range.to {
            pairs.push((self.key("dateRange[to]"), to.format(DATE_FORMAT).to_string()));
        }
        if !state.column_visibility.is_empty() {
            let map: serde_json::Map<String, serde_json::Value> = state
                .column_visibility
                .iter()
                .map(|(column, visible)| (column.clone(), serde_json::Value::Bool(*visible)))
                .collect();
            pairs.push((
                self.key("columnVisibility"),
                serde_json::Value::Object(map).to_string(),
            ));
        }
        pairs
    }

    fn decode(&self, params: &QueryParams) -> TableStatePatch {
        let mut patch = TableStatePatch {
            page: params
                .get(&self.key("page"))
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|p| *p > 0),
            limit: params
                .get(&self.key("limit"))
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|l| *l > 0),
            global_filter: params
                .get(&self.key("search"))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            status_tab: params
                .get(&self.key("statusTab"))
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            sorting: params.get(&self.key("sort")).map(|sort| {
                sort.split(',')
                    .filter_map(ColumnSort::from_sort_key)
                    .collect()
            }),
            ..Default::default()
        };

        let mut filters: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for (key, value) in params.pairs() {
            let Some(dimension) = self
                .local(key)
                .and_then(|k| k.strip_prefix("filters["))
                .and_then(|k| k.strip_suffix("][]"))
            else {
                continue;
            };
            if !value.is_empty() {
                filters
                    .entry(dimension.to_string())
                    .or_default()
                    .insert(value.clone());
            }
        }
        if !filters.is_empty() {
            patch.column_filters = Some(filters);
        }

        let date = |name: &str| {
            params.get(&self.key(name)).and_then(|v| {
                NaiveDate::parse_from_str(v, DATE_FORMAT)
                    .map_err(|e| warn!(param = name, value = v, error = %e, "Ignoring malformed date"))
                    .ok()
            })
        };
        let range = DateRange::new(date("dateRange[from]"), date("dateRange[to]"));
        if !range.is_empty() {
            patch.date_range = Some(range);
        }

        if let Some(raw) = params.get(&self.key("columnVisibility")) {
            match serde_json::from_str::<IndexMap<String, bool>>(raw) {
                Ok(visibility) => patch.column_visibility = Some(visibility),
                Err(e) => warn!(error = %e, "Ignoring malformed columnVisibility"),
            }
        }

        patch
    }
}
