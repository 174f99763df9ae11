//! Table view state and its transitions

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use tessera_api::{SelectionMode, SortDirection, TableBlock};

use crate::error::TableError;

/// Status tab meaning "no status restriction".
pub const ALL_TAB: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSort {
    pub field: String,
    pub direction: SortDirection,
}

impl ColumnSort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// `field` or `-field`, the store's sort syntax.
    pub fn to_sort_key(&self) -> String {
        match self.direction {
            SortDirection::Asc => self.field.clone(),
            SortDirection::Desc => format!("-{}", self.field),
        }
    }

    pub fn from_sort_key(key: &str) -> Option<Self> {
        let key = key.trim();
        match key.strip_prefix('-') {
            Some(field) if !field.is_empty() => Some(Self::desc(field)),
            Some(_) => None,
            None if !key.is_empty() => Some(Self::asc(key)),
            None => None,
        }
    }
}

/// Inclusive date bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    pub page: u64,
    pub limit: u64,
    pub sorting: Vec<ColumnSort>,
    /// Selected values per filter dimension.
    pub column_filters: IndexMap<String, IndexSet<String>>,
    /// Explicit visibility overrides; absent columns are visible.
    pub column_visibility: IndexMap<String, bool>,
    pub global_filter: String,
    pub row_selection: IndexSet<String>,
    pub status_tab: String,
    pub date_range: DateRange,
}

impl TableState {
    pub fn initial(default_limit: u64) -> Self {
        Self {
            page: 1,
            limit: default_limit,
            sorting: Vec::new(),
            column_filters: IndexMap::new(),
            column_visibility: IndexMap::new(),
            global_filter: String::new(),
            row_selection: IndexSet::new(),
            status_tab: ALL_TAB.to_string(),
            date_range: DateRange::default(),
        }
    }

    pub fn filter_values(&self, dimension: &str) -> impl Iterator<Item = &str> {
        self.column_filters
            .get(dimension)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    pub fn is_column_visible(&self, field: &str) -> bool {
        self.column_visibility.get(field).copied().unwrap_or(true)
    }

    pub fn sort_direction(&self, field: &str) -> Option<SortDirection> {
        self.sorting
            .iter()
            .find(|s| s.field == field)
            .map(|s| s.direction)
    }

    pub fn has_filters(&self) -> bool {
        self.column_filters.values().any(|values| !values.is_empty())
            || !self.global_filter.is_empty()
            || !self.date_range.is_empty()
            || self.status_tab != ALL_TAB
    }
}

/// Per-table settings the transitions depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    pub default_limit: u64,
    pub selection: SelectionMode,
    pub max_selection: Option<usize>,
    /// Dimension the status tabs filter on.
    pub status_field: Option<String>,
}

impl TableOptions {
    pub fn new(default_limit: u64) -> Self {
        Self {
            default_limit,
            selection: SelectionMode::None,
            max_selection: None,
            status_field: None,
        }
    }

    pub fn from_block(block: &TableBlock, fallback_limit: u64) -> Self {
        Self {
            default_limit: block.default_limit.filter(|l| *l > 0).unwrap_or(fallback_limit),
            selection: block.selection,
            max_selection: block.max_selection,
            status_field: block.status_field.clone(),
        }
    }

    pub fn with_selection(mut self, mode: SelectionMode, max: Option<usize>) -> Self {
        self.selection = mode;
        self.max_selection = max;
        self
    }

    pub fn with_status_field(mut self, field: impl Into<String>) -> Self {
        self.status_field = Some(field.into());
        self
    }
}

/// User actions on a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableAction {
    SetPage(u64),
    /// Changes page size and returns to page 1.
    SetLimit(u64),
    SetSort(Vec<ColumnSort>),
    /// Cycle one column through ascending, descending and unsorted.
    ToggleSort(String),
    ToggleFilter { dimension: String, value: String },
    ClearFilter(String),
    SetDateRange(DateRange),
    SetGlobalSearch(String),
    SetStatusTab(String),
    SetColumnVisibility { column: String, visible: bool },
    ToggleRowSelection(String),
    ClearSelection,
    /// Reset filters, search, date range, visibility, status tab and paging.
    ClearAll,
}

/// Owns one table's state and applies actions to it.
#[derive(Debug, Clone)]
pub struct TableStateMachine {
    options: TableOptions,
    state: TableState,
}

impl TableStateMachine {
    pub fn new(options: TableOptions) -> Self {
        let state = TableState::initial(options.default_limit);
        Self { options, state }
    }

    pub fn with_state(options: TableOptions, state: TableState) -> Self {
        Self { options, state }
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Apply an action. Returns whether the state changed; rejected actions
    /// leave the state untouched.
    pub fn apply(&mut self, action: TableAction) -> Result<bool, TableError> {
        let mut next = self.state.clone();
        self.transition(&mut next, action)?;
        let changed = next != self.state;
        if changed {
            debug!(page = next.page, limit = next.limit, "Table state changed");
            self.state = next;
        }
        Ok(changed)
    }

    fn transition(&self, state: &mut TableState, action: TableAction) -> Result<(), TableError> {
        match action {
            TableAction::SetPage(page) => {
                if page == 0 {
                    return Err(TableError::InvalidPage);
                }
                state.page = page;
            }
            TableAction::SetLimit(limit) => {
                if limit == 0 {
                    return Err(TableError::InvalidLimit);
                }
                state.limit = limit;
                state.page = 1;
            }
            TableAction::SetSort(sorting) => {
                state.sorting = sorting;
            }
            TableAction::ToggleSort(field) => {
                let next = match state.sort_direction(&field) {
                    None => Some(ColumnSort::asc(&field)),
                    Some(SortDirection::Asc) => Some(ColumnSort::desc(&field)),
                    Some(SortDirection::Desc) => None,
                };
                state.sorting = next.into_iter().collect();
            }
            TableAction::ToggleFilter { dimension, value } => {
                let values = state.column_filters.entry(dimension.clone()).or_default();
                if !values.shift_remove(&value) {
                    values.insert(value);
                }
                if values.is_empty() {
                    state.column_filters.shift_remove(&dimension);
                }
                // a manual status filter replaces the status tab
                if self.is_status_dimension(&dimension) {
                    state.status_tab = ALL_TAB.to_string();
                }
                state.page = 1;
            }
            TableAction::ClearFilter(dimension) => {
                state.column_filters.shift_remove(&dimension);
                state.page = 1;
            }
            TableAction::SetDateRange(range) => {
                if let (Some(from), Some(to)) = (range.from, range.to) {
                    if from > to {
                        return Err(TableError::InvertedDateRange);
                    }
                }
                state.date_range = range;
                state.page = 1;
            }
            TableAction::SetGlobalSearch(search) => {
                state.global_filter = search.trim().to_string();
                state.page = 1;
            }
            TableAction::SetStatusTab(tab) => {
                let tab = if tab.is_empty() { ALL_TAB.to_string() } else { tab };
                if let Some(field) = &self.options.status_field {
                    state.column_filters.shift_remove(field);
                }
                state.status_tab = tab;
                state.page = 1;
            }
            TableAction::SetColumnVisibility { column, visible } => {
                if visible {
                    state.column_visibility.shift_remove(&column);
                } else {
                    state.column_visibility.insert(column, false);
                }
            }
            TableAction::ToggleRowSelection(key) => {
                self.toggle_selection(state, key)?;
            }
            TableAction::ClearSelection => {
                state.row_selection.clear();
            }
            TableAction::ClearAll => {
                let initial = TableState::initial(self.options.default_limit);
                state.column_filters = initial.column_filters;
                state.global_filter = initial.global_filter;
                state.date_range = initial.date_range;
                state.column_visibility = initial.column_visibility;
                state.status_tab = initial.status_tab;
                state.page = initial.page;
                state.limit = initial.limit;
            }
        }
        Ok(())
    }

    fn toggle_selection(&self, state: &mut TableState, key: String) -> Result<(), TableError> {
        match self.options.selection {
            SelectionMode::None => Err(TableError::SelectionDisabled),
            SelectionMode::Single => {
                let was_selected = state.row_selection.contains(&key);
                state.row_selection.clear();
                if !was_selected {
                    state.row_selection.insert(key);
                }
                Ok(())
            }
            SelectionMode::Multi => {
                if state.row_selection.shift_remove(&key) {
                    return Ok(());
                }
                if let Some(max) = self.options.max_selection {
                    if state.row_selection.len() >= max {
                        return Err(TableError::SelectionLimit { max });
                    }
                }
                state.row_selection.insert(key);
                Ok(())
            }
        }
    }

    fn is_status_dimension(&self, dimension: &str) -> bool {
        self.options.status_field.as_deref() == Some(dimension)
    }
}
