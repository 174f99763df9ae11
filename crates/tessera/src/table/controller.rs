//! Drives a table's fetch cycle from its view state

use serde_json::{json, Value};
use tracing::{debug, warn};

use tessera_api::{FindResult, Pagination, QueryDescriptor, TableBlock};
use tessera_core::{execute_query, StoreError};

use crate::error::TableError;

use super::codec::{StateCodec, TableUrlCodec};
use super::query_params::QueryParams;
use super::state::{ColumnSort, TableAction, TableOptions, TableState, TableStateMachine, ALL_TAB};

/// A numbered query issued for the current table state.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRequest {
    pub id: u64,
    pub query: QueryDescriptor,
}

/// State machine plus everything needed to turn its state into queries and
/// accept (or discard) their results.
#[derive(Debug, Clone)]
pub struct TableController {
    machine: TableStateMachine,
    codec: Option<TableUrlCodec>,
    base_query: QueryDescriptor,
    date_field: Option<String>,
    search_fields: Vec<String>,
    next_request: u64,
    last_committed: u64,
    rows: Vec<Value>,
    pagination: Option<Pagination>,
}

impl TableController {
    pub fn new(block: &TableBlock, fallback_limit: u64) -> Self {
        let options = TableOptions::from_block(block, fallback_limit);
        let codec = block
            .sync_url
            .then(|| TableUrlCodec::new(block.url_group.clone(), options.default_limit));
        let mut search_fields = block.search_fields.clone();
        if search_fields.is_empty() {
            search_fields = block
                .query
                .as_ref()
                .and_then(|q| q.search_fields.clone())
                .unwrap_or_default();
        }
        Self {
            machine: TableStateMachine::new(options),
            codec,
            base_query: block.query.clone().unwrap_or_default(),
            date_field: block.date_field.clone(),
            search_fields,
            next_request: 0,
            last_committed: 0,
            rows: Vec::new(),
            pagination: None,
        }
    }

    /// Like [`new`](Self::new), then restores state from `url` when the table syncs to the URL.
    pub fn mount(block: &TableBlock, fallback_limit: u64, url: &QueryParams) -> Self {
        let mut controller = Self::new(block, fallback_limit);
        if let Some(codec) = &controller.codec {
            let patch = codec.decode(url);
            if !patch.is_empty() {
                debug!(?patch, "Restoring table state from URL");
                let mut state = controller.machine.state().clone();
                patch.apply_to(&mut state);
                controller.machine =
                    TableStateMachine::with_state(controller.machine.options().clone(), state);
            }
        }
        controller
    }

    pub fn state(&self) -> &TableState {
        self.machine.state()
    }

    pub fn syncs_url(&self) -> bool {
        self.codec.is_some()
    }

    pub fn dispatch(&mut self, action: TableAction) -> Result<bool, TableError> {
        self.machine.apply(action)
    }

    /// `current` with this table's keys rewritten, or `None` when the table
    /// keeps its state in memory only.
    pub fn url_query(&self, current: &QueryParams) -> Option<QueryParams> {
        self.codec
            .as_ref()
            .map(|codec| codec.write(self.machine.state(), current))
    }

    /// The query for the current state, layered over the block's base query.
    pub fn query(&self) -> QueryDescriptor {
        let state = self.machine.state();
        let mut query = self.base_query.clone();

        let mut clauses: Vec<Value> = query.filter.take().into_iter().collect();
        for (dimension, values) in &state.column_filters {
            if !values.is_empty() {
                let values: Vec<&String> = values.iter().collect();
                clauses.push(json!({ dimension.as_str(): { "in": values } }));
            }
        }
        if let Some(field) = &self.machine.options().status_field {
            if state.status_tab != ALL_TAB {
                clauses.push(json!({ field.as_str(): { "equals": state.status_tab } }));
            }
        }
        if let Some(field) = &self.date_field {
            let mut bounds = serde_json::Map::new();
            if let Some(from) = state.date_range.from {
                bounds.insert("greater_than_equal".into(), json!(from.format("%Y-%m-%d").to_string()));
            }
            // inclusive end date: everything before the following day
            if let Some(next_day) = state.date_range.to.and_then(|to| to.succ_opt()) {
                bounds.insert("less_than".into(), json!(next_day.format("%Y-%m-%d").to_string()));
            }
            if !bounds.is_empty() {
                clauses.push(json!({ field.as_str(): bounds }));
            }
        }
        query.filter = match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(json!({ "and": clauses })),
        };

        if !state.sorting.is_empty() {
            let keys: Vec<String> = state.sorting.iter().map(ColumnSort::to_sort_key).collect();
            query.sort = Some(keys.join(","));
        }
        query.page = Some(state.page);
        query.limit = Some(state.limit);
        if !state.global_filter.is_empty() {
            query.search = Some(state.global_filter.clone());
            if !self.search_fields.is_empty() {
                query.search_fields = Some(self.search_fields.clone());
            }
        }
        query
    }

    pub fn begin_request(&mut self) -> TableRequest {
        self.next_request += 1;
        TableRequest {
            id: self.next_request,
            query: self.query(),
        }
    }

    /// Accept a response unless the state moved on since the request was
    /// issued or a newer response already landed. Returns whether it was kept.
    pub fn commit(&mut self, request: &TableRequest, result: FindResult) -> bool {
        if request.id < self.last_committed || request.query != self.query() {
            warn!(request = request.id, "Discarding superseded table response");
            return false;
        }
        self.last_committed = request.id;
        self.pagination = Some(result.pagination());
        self.rows = result.docs;
        true
    }

    /// Run the current query over rows already in hand (context-fed tables).
    pub fn apply_local(&mut self, docs: &[Value]) -> Result<(), StoreError> {
        let request = self.begin_request();
        let result = execute_query(docs, &request.query)?;
        self.commit(&request, result);
        Ok(())
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    /// Pagination of the last committed response.
    pub fn pagination(&self) -> Pagination {
        self.pagination.clone().unwrap_or_else(|| {
            let state = self.machine.state();
            Pagination::new(state.page, state.limit, 0)
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.pagination.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::state::DateRange;
    use chrono::NaiveDate;
    use tessera_api::Block;

    fn table(value: Value) -> TableBlock {
        match Block::parse(&value) {
            Block::Table(block) | Block::BlocksTable(block) => block,
            other => panic!("expected table, got {other:?}"),
        }
    }

    fn orders_table() -> TableBlock {
        table(json!({
            "blockType": "table",
            "collection": "orders",
            "columns": [{"field": "id"}, {"field": "status"}],
            "statusField": "status",
            "dateField": "createdAt",
            "searchFields": ["customer"],
            "syncUrl": true,
            "urlGroup": "orders",
            "query": {"where": {"archived": {"equals": false}}, "depth": 1}
        }))
    }

    #[test]
    fn test_query_layers_state_over_base() {
        let mut c = TableController::new(&orders_table(), 10);
        c.dispatch(TableAction::SetStatusTab("paid".into())).unwrap();
        c.dispatch(TableAction::SetGlobalSearch("ada".into())).unwrap();
        c.dispatch(TableAction::SetDateRange(DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 1, 31),
        )))
        .unwrap();
        c.dispatch(TableAction::ToggleSort("total".into())).unwrap();

        let q = c.query();
        assert_eq!(
            q.filter,
            Some(json!({"and": [
                {"archived": {"equals": false}},
                {"status": {"equals": "paid"}},
                {"createdAt": {"greater_than_equal": "2024-01-01", "less_than": "2024-02-01"}}
            ]}))
        );
        assert_eq!(q.sort.as_deref(), Some("total"));
        assert_eq!((q.page, q.limit, q.depth), (Some(1), Some(10), Some(1)));
        assert_eq!(q.search.as_deref(), Some("ada"));
        assert_eq!(q.search_fields, Some(vec!["customer".to_string()]));
    }

    #[test]
    fn test_filters_become_in_clauses() {
        let mut c = TableController::new(&table(json!({"blockType": "table", "collection": "x"})), 5);
        c.dispatch(TableAction::ToggleFilter {
            dimension: "region".into(),
            value: "eu".into(),
        })
        .unwrap();
        assert_eq!(c.query().filter, Some(json!({"region": {"in": ["eu"]}})));
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut c = TableController::new(&orders_table(), 10);
        let first = c.begin_request();
        c.dispatch(TableAction::SetPage(2)).unwrap();
        let second = c.begin_request();

        let page_two = FindResult {
            docs: vec![json!({"id": "b"})],
            total_docs: 11,
            page: 2,
            total_pages: 2,
            limit: 10,
        };
        assert!(c.commit(&second, page_two));
        assert!(!c.commit(
            &first,
            FindResult {
                docs: vec![json!({"id": "a"})],
                ..Default::default()
            }
        ));
        assert_eq!(c.rows(), &[json!({"id": "b"})]);
        assert_eq!(c.pagination().page, 2);
    }

    #[test]
    fn test_older_request_with_same_query_loses_to_newer() {
        let mut c = TableController::new(&orders_table(), 10);
        let older = c.begin_request();
        let newer = c.begin_request();
        assert!(c.commit(&newer, FindResult::default()));
        assert!(!c.commit(&older, FindResult::default()));
    }

    #[test]
    fn test_mount_restores_and_writes_url() {
        let url = QueryParams::parse("orders.page=3&orders.statusTab=paid&other=1");
        let mut c = TableController::mount(&orders_table(), 10, &url);
        assert_eq!(c.state().page, 3);
        assert_eq!(c.state().status_tab, "paid");

        c.dispatch(TableAction::ClearAll).unwrap();
        assert_eq!(c.url_query(&url).unwrap().to_query_string(), "other=1");
    }

    #[test]
    fn test_memory_only_table_ignores_url() {
        let block = table(json!({"blockType": "table", "collection": "x"}));
        let c = TableController::mount(&block, 10, &QueryParams::parse("page=4"));
        assert_eq!(c.state().page, 1);
        assert!(c.url_query(&QueryParams::new()).is_none());
    }

    #[test]
    fn test_apply_local_paginates_rows_in_hand() {
        let block = table(json!({"blockType": "table", "dataKey": "users", "defaultLimit": 2}));
        let mut c = TableController::new(&block, 10);
        let docs: Vec<Value> = (1..=5).map(|i| json!({"id": i})).collect();
        c.dispatch(TableAction::SetPage(3)).unwrap();
        c.apply_local(&docs).unwrap();
        assert_eq!(c.rows(), &[json!({"id": 5})]);
        assert_eq!(c.pagination().total_pages, 3);
    }
}
