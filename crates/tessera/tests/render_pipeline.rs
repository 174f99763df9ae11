mod common;

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tessera::{BlockEngine, EngineConfig};
use tessera_api::RenderNode;

use common::{engine, scope_children, stat_display, store};

#[tokio::test]
async fn test_stat_card_reads_count_from_enclosing_fetch() -> Result<()> {
    let nodes = engine()
        .render(&[json!({
            "blockType": "dataFetch",
            "dataKey": "orders",
            "source": {"type": "collection", "collection": "orders"},
            "transform": {"type": "count"},
            "children": [{"blockType": "statCard", "label": "Orders", "dataKey": "orders"}]
        })])
        .await;

    match &nodes[0] {
        RenderNode::DataScope { data_key, keys, children } => {
            assert_eq!(data_key, "orders");
            assert_eq!(keys, &vec!["orders".to_string()]);
            // total reported by the store, not the default page of 10
            assert_eq!(stat_display(&children[0]), "12");
        }
        other => panic!("expected data scope, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_inner_fetch_shadows_outer_key_for_its_subtree_only() -> Result<()> {
    let nodes = engine()
        .render(&[json!({
            "blockType": "dataFetch",
            "source": {"type": "global", "global": "site-settings"},
            "transform": {"type": "first"},
            "children": [
                {
                    "blockType": "dataFetch",
                    "source": {"type": "collection", "collection": "users"},
                    "transform": {"type": "count"},
                    "children": [{"blockType": "statCard", "label": "Users"}]
                },
                {"blockType": "statCard", "label": "Currency", "field": "currency", "format": "raw"}
            ]
        })])
        .await;

    let outer = scope_children(&nodes[0]);
    assert_eq!(stat_display(&scope_children(&outer[0])[0]), "3");
    assert_eq!(stat_display(&outer[1]), "EUR");
    Ok(())
}

#[tokio::test]
async fn test_stat_card_without_data_shows_loading() -> Result<()> {
    let nodes = engine()
        .render(&[json!({"blockType": "statCard", "label": "Revenue", "dataKey": "revenue"})])
        .await;
    assert!(matches!(&nodes[0], RenderNode::Stat { loading: true, .. }));
    Ok(())
}

#[tokio::test]
async fn test_stat_card_formats() -> Result<()> {
    let nodes = engine()
        .render(&[
            json!({"blockType": "statCard", "label": "a", "value": 1234567.891, "format": "currency", "prefix": "€"}),
            json!({"blockType": "statCard", "label": "b", "value": 12.345, "format": "percent"}),
            json!({"blockType": "statCard", "label": "c", "value": "n/a", "format": "raw"}),
        ])
        .await;
    assert_eq!(stat_display(&nodes[0]), "€1,234,567.89");
    assert_eq!(stat_display(&nodes[1]), "12.3%");
    assert_eq!(stat_display(&nodes[2]), "n/a");
    Ok(())
}

#[tokio::test]
async fn test_unknown_and_invalid_blocks_do_not_break_siblings() -> Result<()> {
    let nodes = engine()
        .render(&[
            json!({"blockType": "heading", "text": "Top"}),
            json!({"blockType": "carousel", "slides": []}),
            json!("not a block"),
            json!({"blockType": "heading"}),
            json!({"blockType": "heading", "text": "Bottom", "level": 9}),
        ])
        .await;

    assert_eq!(nodes.len(), 5);
    assert_eq!(
        nodes[1],
        RenderNode::Unknown {
            block_type: "carousel".into()
        }
    );
    assert!(matches!(&nodes[2], RenderNode::Invalid { .. }));
    assert!(matches!(&nodes[3], RenderNode::Invalid { block_type, .. } if block_type == "heading"));
    assert_eq!(
        nodes[4],
        RenderNode::Heading {
            level: 6,
            text: "Bottom".into()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_grid_renders_cells_in_order() -> Result<()> {
    let nodes = engine()
        .render(&[json!({
            "blockType": "grid",
            "columns": 3,
            "items": [
                {"span": 2, "content": [{"blockType": "heading", "text": "wide"}]},
                {"span": 7, "content": [{"blockType": "heading", "text": "clamped"}]}
            ]
        })])
        .await;

    let RenderNode::Grid { columns, cells } = &nodes[0] else {
        panic!("expected grid, got {:?}", nodes[0]);
    };
    assert_eq!(*columns, 3);
    assert_eq!(cells.iter().map(|c| c.span).collect::<Vec<_>>(), vec![2, 3]);
    Ok(())
}

#[tokio::test]
async fn test_block_ref_injects_props_and_slot_content() -> Result<()> {
    let nodes = engine()
        .render(&[
            json!({
                "blockType": "blockRef",
                "block": "hero",
                "props": {
                    "name": "Ada",
                    "slots": {"body": [{"blockType": "richText", "content": {"text": "Welcome"}}]}
                }
            }),
            json!({"blockType": "blockRef", "block": "hero", "props": {"name": "Brian"}}),
        ])
        .await;

    assert_eq!(
        nodes[0],
        RenderNode::Reference {
            block_type: "blockRef".into(),
            id: "hero".into(),
            children: vec![
                RenderNode::Heading {
                    level: 1,
                    text: "Hello Ada".into()
                },
                RenderNode::RichText {
                    document: json!({"text": "Welcome"})
                },
            ],
        }
    );
    assert_eq!(
        nodes[1].children()[1],
        RenderNode::Heading {
            level: 2,
            text: "Nothing here yet".into()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_section_ref_accepts_populated_document() -> Result<()> {
    let nodes = engine()
        .render(&[
            json!({"blockType": "sectionRef", "section": "footer"}),
            json!({
                "blockType": "sectionRef",
                "section": {"id": "inline", "layout": [{"blockType": "heading", "text": "Inline"}]}
            }),
        ])
        .await;

    assert_eq!(nodes[0].children().len(), 1);
    assert!(matches!(&nodes[1], RenderNode::Reference { id, .. } if id == "inline"));
    Ok(())
}

#[tokio::test]
async fn test_missing_reference_is_a_local_error() -> Result<()> {
    let nodes = engine()
        .render(&[
            json!({"blockType": "blockRef", "block": "nope"}),
            json!({"blockType": "heading", "text": "still here"}),
        ])
        .await;
    assert!(matches!(&nodes[0], RenderNode::Error { message, .. } if message.contains("nope")));
    assert!(matches!(&nodes[1], RenderNode::Heading { .. }));
    Ok(())
}

#[tokio::test]
async fn test_reference_cycle_stops_at_depth_limit() -> Result<()> {
    let engine = BlockEngine::new(Arc::new(store()))
        .with_config(EngineConfig::new().with_max_reference_depth(4));
    let nodes = engine.render(&[json!({"blockType": "blockRef", "block": "loop"})]).await;

    let mut depth = 0;
    let mut node = &nodes[0];
    while let RenderNode::Reference { children, .. } = node {
        depth += 1;
        node = &children[0];
    }
    assert_eq!(depth, 4);
    assert!(matches!(node, RenderNode::Error { message, .. } if message.contains("recursion")));
    Ok(())
}

#[tokio::test]
async fn test_top_level_slot_renders_defaults() -> Result<()> {
    let nodes = engine()
        .render(&[json!({
            "blockType": "slot",
            "name": "aside",
            "defaultBlocks": [{"blockType": "heading", "text": "Aside"}]
        })])
        .await;
    assert_eq!(nodes[0].children().len(), 1);
    Ok(())
}
