mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::{json, Value};
use tessera::testing::FlakyStore;
use tessera::{BlockEngine, NodeState, TableAction, TableError};
use tessera_api::RenderNode;
use tessera_core::DocumentStore;

use common::{engine, scope_children, stat_display, store, table_view};

fn count_of(collection: &str) -> Value {
    json!({
        "blockType": "dataFetch",
        "source": {"type": "collection", "collection": collection},
        "transform": {"type": "count"},
        "children": [{"blockType": "statCard", "label": collection}]
    })
}

#[tokio::test]
async fn test_first_render_is_loading_then_data_lands() -> Result<()> {
    let page = engine().mount(vec![count_of("users")], "");

    let first = page.render().await;
    assert_eq!(
        first[0],
        RenderNode::Loading {
            block_type: "dataFetch".into()
        }
    );

    page.settled().await;
    let second = page.render().await;
    assert_eq!(stat_display(&scope_children(&second[0])[0]), "3");
    assert!(matches!(page.node_state("0"), Some(NodeState::Ready(_))));
    Ok(())
}

#[tokio::test]
async fn test_render_settled_resolves_nested_fetches() -> Result<()> {
    let page = engine().mount(
        vec![json!({
            "blockType": "dataFetch",
            "dataKey": "outer",
            "source": {"type": "collection", "collection": "orders"},
            "children": [count_of("users")]
        })],
        "",
    );
    let nodes = page.render_settled().await;
    let inner = &scope_children(&nodes[0])[0];
    assert_eq!(stat_display(&scope_children(inner)[0]), "3");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_refresh_interval_refetches() -> Result<()> {
    let store = Arc::new(FlakyStore::new(store()));
    let page = BlockEngine::new(store.clone()).mount(
        vec![json!({
            "blockType": "dataFetch",
            "source": {"type": "collection", "collection": "users"},
            "transform": {"type": "count"},
            "refreshInterval": 5,
            "children": [{"blockType": "statCard", "label": "Users"}]
        })],
        "",
    );
    let nodes = page.render_settled().await;
    assert_eq!(stat_display(&scope_children(&nodes[0])[0]), "3");

    store
        .inner()
        .create("users", json!({"name": "Dan"}))
        .await
        .expect("create user");
    tokio::time::sleep(Duration::from_millis(5_001)).await;
    page.settled().await;

    let nodes = page.render().await;
    assert_eq!(stat_display(&scope_children(&nodes[0])[0]), "4");
    assert_eq!(store.find_calls(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unmount_stops_refresh() -> Result<()> {
    let store = Arc::new(FlakyStore::new(store()));
    let page = BlockEngine::new(store.clone()).mount(
        vec![json!({
            "blockType": "dataFetch",
            "source": {"type": "collection", "collection": "users"},
            "refreshInterval": 1,
            "children": []
        })],
        "",
    );
    page.render_settled().await;
    let calls = store.find_calls();

    page.unmount();
    assert!(page.is_unmounted());
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(store.find_calls(), calls);
    assert!(!page.refresh("0"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_superseded_fetch_result_is_discarded() -> Result<()> {
    let store = FlakyStore::new(store()).with_delay("orders", Duration::from_secs(10));
    let page = BlockEngine::new(Arc::new(store)).mount(vec![count_of("orders")], "");
    assert!(matches!(&page.render().await[0], RenderNode::Loading { .. }));

    // same position, different configuration: a new generation
    page.replace_blocks(vec![count_of("users")]);
    assert!(matches!(&page.render().await[0], RenderNode::Loading { .. }));

    // the slow orders response lands last and must not win
    page.settled().await;
    let nodes = page.render().await;
    assert_eq!(stat_display(&scope_children(&nodes[0])[0]), "3");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_older_refresh_cycle_landing_late_is_discarded() -> Result<()> {
    let store = Arc::new(FlakyStore::new(store()).with_delay("users", Duration::from_secs(10)));
    let page = BlockEngine::new(store.clone()).mount(vec![count_of("users")], "");
    assert!(matches!(&page.render().await[0], RenderNode::Loading { .. }));
    // let the first cycle reach the store before the delay changes
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(store.find_calls(), 1);

    // a faster refresh overtakes the first cycle
    store.set_delay("users", Some(Duration::from_secs(1)));
    assert!(page.refresh("0"));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(matches!(page.node_state("0"), Some(NodeState::Ready(_))));

    // the first cycle now fails when it finally lands, and must not win
    store.set_failing("users", true);
    page.settled().await;
    assert!(matches!(page.node_state("0"), Some(NodeState::Ready(_))));
    let nodes = page.render().await;
    assert_eq!(stat_display(&scope_children(&nodes[0])[0]), "3");
    Ok(())
}

#[tokio::test]
async fn test_refresh_keeps_showing_data_while_refetching() -> Result<()> {
    let page = engine().mount(vec![count_of("users")], "");
    page.render_settled().await;

    assert!(page.refresh("0"));
    assert!(!page.refresh("nope"));
    let nodes = page.render().await;
    assert_eq!(stat_display(&scope_children(&nodes[0])[0]), "3");
    page.settled().await;
    Ok(())
}

fn orders_table() -> Value {
    json!({
        "blockType": "table",
        "collection": "orders",
        "defaultLimit": 5,
        "syncUrl": true,
        "urlGroup": "orders",
        "selection": "multi",
        "maxSelection": 1,
        "columns": [{"field": "id"}, {"field": "total"}]
    })
}

#[tokio::test]
async fn test_table_actions_update_url_and_rows() -> Result<()> {
    let page = engine().mount(vec![orders_table()], "utm=x");
    page.render_settled().await;
    assert_eq!(page.table_paths(), vec!["0".to_string()]);

    assert!(page.dispatch_table("0", TableAction::SetPage(2))?);
    assert!(!page.dispatch_table("0", TableAction::SetPage(2))?);
    assert_eq!(page.url_query(), "utm=x&orders.page=2");

    let nodes = page.render().await;
    let view = table_view(&nodes[0]);
    assert_eq!(view.pagination.page, 2);
    assert_eq!(view.rows[0].key, "o6");
    assert_eq!(view.url_query.as_deref(), Some("utm=x&orders.page=2"));
    Ok(())
}

#[tokio::test]
async fn test_table_selection_is_capped() -> Result<()> {
    let page = engine().mount(vec![orders_table()], "");
    page.render_settled().await;

    page.dispatch_table("0", TableAction::ToggleRowSelection("o1".into()))?;
    assert_eq!(
        page.dispatch_table("0", TableAction::ToggleRowSelection("o2".into())),
        Err(TableError::SelectionLimit { max: 1 })
    );
    assert_eq!(
        page.dispatch_table("9", TableAction::ClearAll),
        Err(TableError::UnknownTable("9".into()))
    );

    let nodes = page.render().await;
    let view = table_view(&nodes[0]);
    assert!(view.rows[0].selected);
    assert!(!view.rows[1].selected);
    Ok(())
}

#[tokio::test]
async fn test_removed_nodes_are_pruned() -> Result<()> {
    let page = engine().mount(vec![orders_table(), count_of("users")], "");
    page.render_settled().await;
    assert!(page.node_state("1").is_some());

    page.replace_blocks(vec![]);
    page.render().await;
    assert!(page.table_paths().is_empty());
    assert!(page.node_state("1").is_none());
    Ok(())
}

#[tokio::test]
async fn test_store_writes_show_up_on_next_cycle() -> Result<()> {
    let store = Arc::new(store());
    let page = BlockEngine::new(store.clone()).mount(vec![count_of("users")], "");
    page.render_settled().await;

    let created = store.create("users", json!({"name": "Eve"})).await.expect("create");
    assert!(created.get("id").is_some());
    page.refresh("0");
    page.settled().await;
    let nodes = page.render().await;
    assert_eq!(stat_display(&scope_children(&nodes[0])[0]), "4");
    Ok(())
}
