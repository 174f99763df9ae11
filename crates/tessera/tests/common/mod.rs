#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use tessera::BlockEngine;
use tessera_api::{RenderNode, TableView};
use tessera_core::InMemoryStore;

pub fn orders() -> Vec<Value> {
    (1..=12)
        .map(|i| {
            json!({
                "id": format!("o{i}"),
                "total": i * 10,
                "status": if i % 3 == 0 { "refunded" } else { "paid" },
                "region": if i % 2 == 0 { "eu" } else { "us" },
                "createdAt": format!("2024-01-{i:02}"),
                "customer": if i % 4 == 0 { "Ada" } else { "Brian" }
            })
        })
        .collect()
}

pub fn fixture() -> Value {
    json!({
        "collections": {
            "orders": orders(),
            "users": [
                {"id": "u1", "name": "Ada", "role": "admin"},
                {"id": "u2", "name": "Brian", "role": "editor"},
                {"id": "u3", "name": "Cleo", "role": "editor"}
            ],
            "blocks": [
                {
                    "id": "hero",
                    "blocks": [
                        {"blockType": "heading", "text": "Hello ${name}", "level": 1},
                        {"blockType": "slot", "name": "body", "defaultBlocks": [
                            {"blockType": "heading", "text": "Nothing here yet"}
                        ]}
                    ]
                },
                {
                    "id": "loop",
                    "blocks": [{"blockType": "blockRef", "block": "loop"}]
                }
            ],
            "sections": [
                {"id": "footer", "content": [{"blockType": "heading", "text": "Footer"}]}
            ]
        },
        "globals": {
            "site-settings": {"title": "Acme", "currency": "EUR"}
        }
    })
}

pub fn store() -> InMemoryStore {
    InMemoryStore::from_fixture(&fixture()).expect("valid fixture")
}

pub fn engine() -> BlockEngine {
    BlockEngine::new(Arc::new(store()))
}

pub fn stat_display(node: &RenderNode) -> &str {
    match node {
        RenderNode::Stat { display, .. } => display,
        other => panic!("expected stat, got {other:?}"),
    }
}

pub fn scope_children(node: &RenderNode) -> &[RenderNode] {
    match node {
        RenderNode::DataScope { children, .. } => children,
        other => panic!("expected data scope, got {other:?}"),
    }
}

pub fn table_view(node: &RenderNode) -> &TableView {
    match node {
        RenderNode::Table(view) => view,
        other => panic!("expected table, got {other:?}"),
    }
}
