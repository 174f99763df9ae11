//! `table` and `blocksTable`
//!
//! A table is context-fed (rows come from an enclosing `dataFetch`) or runs
//! its own query against a collection. Either way the current
//! [`TableController`] state decides which page of which rows is shown.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use tessera_api::block::tags;
use tessera_api::value::{docs_from, js_string, value_at_path};
use tessera_api::{
    Envelope, Pagination, RenderNode, TableBlock, TableCell, TableRow, TableView, TableViewColumn,
    ROW_DATA_KEY,
};

use crate::error::RenderError;
use crate::props::resolve_children;
use crate::render::context::RenderContext;
use crate::render::interpreter::render_blocks;
use crate::render::mount::MountRegistry;
use crate::table::{QueryParams, TableController, TableState};

/// Where the table's controller lives: owned by this render, or kept by the mount.
enum ControllerHandle<'a> {
    Local(TableController),
    Mounted {
        registry: &'a Arc<MountRegistry>,
        path: &'a str,
        block: &'a TableBlock,
        url: &'a QueryParams,
    },
}

impl ControllerHandle<'_> {
    /// Never hold the registry lock across an await: callers get the
    /// controller only for the duration of `f`.
    fn with<R>(&mut self, f: impl FnOnce(&mut TableController) -> R) -> R {
        match self {
            ControllerHandle::Local(controller) => f(controller),
            ControllerHandle::Mounted {
                registry,
                path,
                block,
                url,
            } => registry.with_table(*path, *block, *url, f),
        }
    }
}

struct Snapshot {
    state: TableState,
    rows: Vec<Value>,
    pagination: Pagination,
    url_query: Option<QueryParams>,
}

pub async fn build(block: &TableBlock, block_type: &str, ctx: &RenderContext) -> Result<RenderNode, RenderError> {
    let fallback = ctx.config().default_table_limit;
    let mut handle = match &ctx.mount {
        Some(registry) => ControllerHandle::Mounted {
            registry,
            path: &ctx.path,
            block,
            url: &ctx.url_query,
        },
        None => ControllerHandle::Local(TableController::mount(block, fallback, &ctx.url_query)),
    };

    if let Some(key) = block.context_key() {
        let envelope = ctx.data.by_key(key);
        if envelope.loading {
            return Ok(RenderNode::Loading {
                block_type: block_type.to_string(),
            });
        }
        if let Some(error) = envelope.error {
            return Ok(RenderNode::Error {
                block_type: block_type.to_string(),
                message: error,
            });
        }
        let docs = envelope.docs.unwrap_or_else(|| docs_from(&envelope.data));
        handle
            .with(|controller| controller.apply_local(&docs))
            .map_err(|e| RenderError::Store(e.to_string()))?;
    } else if let Some(collection) = block.collection.as_deref().filter(|c| !c.is_empty()) {
        let request = handle.with(TableController::begin_request);
        debug!(collection, page = ?request.query.page, "Fetching table rows");
        let result = ctx
            .services
            .store
            .find(collection, &request.query)
            .await
            .map_err(|e| RenderError::Store(e.to_string()))?;
        handle.with(|controller| controller.commit(&request, result));
    } else {
        return Err(RenderError::TableWithoutSource);
    }

    let snapshot = handle.with(|controller| Snapshot {
        state: controller.state().clone(),
        rows: controller.rows().to_vec(),
        pagination: controller.pagination(),
        url_query: controller.url_query(&ctx.url_query),
    });
    Ok(RenderNode::Table(view(block, block_type, snapshot, ctx).await))
}

async fn view(block: &TableBlock, block_type: &str, snapshot: Snapshot, ctx: &RenderContext) -> TableView {
    let Snapshot {
        state,
        rows,
        pagination,
        url_query,
    } = snapshot;

    // explicit visibility in the state overrides the column's own `hidden`
    let visible: Vec<_> = block
        .columns
        .iter()
        .filter(|column| {
            state
                .column_visibility
                .get(&column.field)
                .copied()
                .unwrap_or(!column.hidden)
        })
        .collect();

    let columns = visible
        .iter()
        .map(|column| TableViewColumn {
            field: column.field.clone(),
            label: column.label().to_string(),
            sortable: column.sortable,
            sorted: state.sort_direction(&column.field),
        })
        .collect();

    let templated = block_type == tags::BLOCKS_TABLE;
    let mut table_rows = Vec::with_capacity(rows.len());
    for (index, doc) in rows.iter().enumerate() {
        let key = value_at_path(doc, block.row_key())
            .filter(|v| !v.is_null())
            .map(js_string)
            .unwrap_or_else(|| index.to_string());

        let mut cells = Vec::with_capacity(visible.len());
        for column in &visible {
            if templated && !column.cell.is_empty() {
                let props = doc.as_object().cloned().unwrap_or_default();
                let template = resolve_children(&column.cell, &props);
                let cell_ctx = ctx
                    .with_data(ctx.data.with_entry(ROW_DATA_KEY, Envelope::ready(doc.clone())))
                    .at(format_args!("rows.{index}.{}", column.field));
                cells.push(TableCell::Blocks(render_blocks(&template, &cell_ctx).await));
            } else {
                let value = value_at_path(doc, &column.field).cloned().unwrap_or(Value::Null);
                cells.push(TableCell::Value(value));
            }
        }

        table_rows.push(TableRow {
            selected: state.row_selection.contains(&key),
            key,
            cells,
        });
    }

    TableView {
        block_type: block_type.to_string(),
        title: block.title.clone(),
        columns,
        rows: table_rows,
        pagination,
        status_tab: state.status_tab,
        search: state.global_filter,
        url_query: url_query.map(|q| q.to_query_string()),
    }
}
