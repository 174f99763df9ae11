mod common;

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tessera::testing::{FlakyStore, StaticEndpoints};
use tessera::BlockEngine;
use tessera_api::{ApiResponse, Pagination, RenderNode};

use common::{engine, scope_children, stat_display, store};

#[tokio::test]
async fn test_no_sources_is_an_error_placeholder() -> Result<()> {
    let nodes = engine()
        .render(&[json!({"blockType": "dataFetch", "children": []})])
        .await;
    assert_eq!(
        nodes[0],
        RenderNode::Error {
            block_type: "dataFetch".into(),
            message: "no data sources configured".into()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_all_sources_failing_keeps_siblings() -> Result<()> {
    let engine = BlockEngine::new(Arc::new(FlakyStore::new(store()).failing("orders")));
    let nodes = engine
        .render(&[
            json!({
                "blockType": "dataFetch",
                "source": {"type": "collection", "collection": "orders"},
                "children": [{"blockType": "heading", "text": "never"}]
            }),
            json!({"blockType": "heading", "text": "sibling"}),
        ])
        .await;

    assert!(matches!(&nodes[0], RenderNode::Error { message, .. } if message.contains("orders is unavailable")));
    assert!(matches!(&nodes[1], RenderNode::Heading { .. }));
    Ok(())
}

#[tokio::test]
async fn test_separate_merge_keeps_surviving_sources() -> Result<()> {
    let nodes = engine()
        .render(&[json!({
            "blockType": "dataFetch",
            "dataKey": "dash",
            "mergeStrategy": "separate",
            "transform": {"type": "count"},
            "sources": [
                {"type": "collection", "collection": "users", "dataKey": "people"},
                {"type": "collection", "collection": "missing", "dataKey": "broken"},
                {"type": "collection", "collection": "orders"}
            ],
            "children": [
                {"blockType": "statCard", "label": "People", "dataKey": "people"},
                {"blockType": "statCard", "label": "Broken", "dataKey": "broken"},
                {"blockType": "statCard", "label": "Orders", "dataKey": "dash_2"}
            ]
        })])
        .await;

    let RenderNode::DataScope { keys, children, .. } = &nodes[0] else {
        panic!("expected data scope, got {:?}", nodes[0]);
    };
    // the failed source publishes nothing, so its key reads as never loaded
    assert_eq!(keys, &vec!["people", "dash_2", "dash"]);
    assert_eq!(stat_display(&children[0]), "3");
    assert!(matches!(&children[1], RenderNode::Stat { loading: true, error: None, .. }));
    assert_eq!(stat_display(&children[2]), "12");
    Ok(())
}

#[tokio::test]
async fn test_union_sums_totals_across_sources() -> Result<()> {
    let nodes = engine()
        .render(&[json!({
            "blockType": "dataFetch",
            "sources": [
                {"type": "collection", "collection": "users"},
                {"type": "collection", "collection": "orders", "query": {"where": {"region": {"equals": "eu"}}}}
            ],
            "transform": {"type": "count"},
            "children": [{"blockType": "statCard", "label": "Everything"}]
        })])
        .await;
    assert_eq!(stat_display(&scope_children(&nodes[0])[0]), "9");
    Ok(())
}

#[tokio::test]
async fn test_sum_and_average_transforms() -> Result<()> {
    let fetch = |kind: &str| {
        json!({
            "blockType": "dataFetch",
            "source": {"type": "collection", "collection": "orders"},
            "query": {"limit": 0},
            "transform": {"type": kind, "field": "total"},
            "children": [{"blockType": "statCard", "label": kind, "format": "raw"}]
        })
    };
    let nodes = engine().render(&[fetch("sum"), fetch("average")]).await;
    assert_eq!(stat_display(&scope_children(&nodes[0])[0]), "780");
    assert_eq!(stat_display(&scope_children(&nodes[1])[0]), "65");
    Ok(())
}

#[tokio::test]
async fn test_endpoint_source_forwards_query() -> Result<()> {
    let endpoints = Arc::new(StaticEndpoints::new().with_response(
        "/api/stats",
        ApiResponse {
            success: true,
            data: json!({"docs": [{"id": 1}, {"id": 2}]}),
            pagination: Some(Pagination::new(1, 2, 40)),
            error: None,
        },
    ));
    let engine = BlockEngine::new(Arc::new(store())).with_endpoints(endpoints.clone());
    let nodes = engine
        .render(&[json!({
            "blockType": "dataFetch",
            "source": {"type": "endpoint", "endpoint": "/api/stats", "collection": "orders"},
            "query": {"limit": 2, "sort": "-total"},
            "transform": {"type": "count"},
            "children": [{"blockType": "statCard", "label": "Remote"}]
        })])
        .await;

    assert_eq!(stat_display(&scope_children(&nodes[0])[0]), "40");
    let calls = endpoints.calls();
    assert_eq!(calls.len(), 1);
    let (endpoint, params) = &calls[0];
    assert_eq!(endpoint, "/api/stats");
    assert!(params.contains(&("collection".to_string(), "orders".to_string())));
    assert!(params.contains(&("limit".to_string(), "2".to_string())));
    assert!(params.contains(&("sort".to_string(), "-total".to_string())));
    Ok(())
}

#[tokio::test]
async fn test_endpoint_without_client_fails_the_node() -> Result<()> {
    let nodes = engine()
        .render(&[json!({
            "blockType": "dataFetch",
            "source": {"type": "endpoint", "endpoint": "/api/stats"},
            "children": []
        })])
        .await;
    assert!(matches!(&nodes[0], RenderNode::Error { message, .. } if message.contains("/api/stats")));
    Ok(())
}
