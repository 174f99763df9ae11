//! Prop injection and slot substitution for reusable blocks
//!
//! Resolution is a pure structural transform: the input block is never
//! mutated, every string leaf is interpolated against the caller's props, and
//! `slot` nodes are replaced by caller content (`props.slots[name]`), their
//! `defaultBlocks`, or nothing. Substituted content is used as-is.

use serde_json::{Map, Value};
use tessera_api::block::is_slot;

use crate::template::interpolate;

/// Props key holding caller-supplied slot content.
pub const SLOTS_KEY: &str = "slots";

/// Outcome of resolving one block.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Block(Value),
    /// A slot expanded to zero or more sibling blocks.
    Blocks(Vec<Value>),
    /// A slot with neither caller content nor defaults.
    Empty,
}

/// Resolve a single block against `params`.
pub fn resolve(block: &Value, params: &Map<String, Value>) -> Resolved {
    if is_slot(block) {
        return slot_content(block, params);
    }
    Resolved::Block(resolve_value(block, params))
}

/// Resolve a block list and flatten the result.
pub fn resolve_children(blocks: &[Value], params: &Map<String, Value>) -> Vec<Value> {
    flatten(blocks.iter().map(|block| resolve(block, params)))
}

/// Flatten resolved children, dropping empty slots and `null` / `false` entries.
pub fn flatten(resolved: impl IntoIterator<Item = Resolved>) -> Vec<Value> {
    let mut out = Vec::new();
    for item in resolved {
        match item {
            Resolved::Block(block) => {
                if !is_dropped(&block) {
                    out.push(block);
                }
            }
            Resolved::Blocks(blocks) => out.extend(blocks.into_iter().filter(|b| !is_dropped(b))),
            Resolved::Empty => {}
        }
    }
    out
}

fn is_dropped(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(false))
}

fn slot_content(slot: &Value, params: &Map<String, Value>) -> Resolved {
    let name = slot.get("name").and_then(Value::as_str).unwrap_or_default();
    let supplied = params
        .get(SLOTS_KEY)
        .and_then(|slots| slots.get(name))
        .and_then(Value::as_array)
        .filter(|content| !content.is_empty());
    if let Some(content) = supplied {
        return Resolved::Blocks(content.clone());
    }
    match slot.get("defaultBlocks").and_then(Value::as_array) {
        Some(defaults) => Resolved::Blocks(defaults.clone()),
        None => Resolved::Empty,
    }
}

fn resolve_value(value: &Value, params: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate(s, params)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, field)| (key.clone(), resolve_field(field, params)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(resolve_array(items, params)),
        other => other.clone(),
    }
}

// A slot used directly as a field value becomes its block list (or null).
fn resolve_field(field: &Value, params: &Map<String, Value>) -> Value {
    if !is_slot(field) {
        return resolve_value(field, params);
    }
    match slot_content(field, params) {
        Resolved::Blocks(blocks) => Value::Array(blocks),
        Resolved::Block(block) => block,
        Resolved::Empty => Value::Null,
    }
}

// Slots inside arrays are spliced in place so one slot can expand to many siblings.
fn resolve_array(items: &[Value], params: &Map<String, Value>) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if is_slot(item) {
            match slot_content(item, params) {
                Resolved::Blocks(blocks) => out.extend(blocks),
                Resolved::Block(block) => out.push(block),
                Resolved::Empty => {}
            }
        } else {
            out.push(resolve_value(item, params));
        }
    }
    out
}
