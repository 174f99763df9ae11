//! Query evaluation over in-memory document lists
//!
//! Implements the store's query contract (`where` / `sort` / `search` /
//! `page` / `limit` / `select`) against a slice of JSON documents. Used by
//! [`InMemoryStore`](crate::InMemoryStore) and by context-fed tables that
//! filter and paginate rows that were already fetched.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use tessera_api::value::{js_string, value_at_path};
use tessera_api::{FindResult, QueryDescriptor};

use crate::error::StoreError;

/// Page size applied when a query does not set `limit`.
pub const DEFAULT_LIMIT: u64 = 10;

const OPERATORS: &[&str] = &[
    "equals",
    "not_equals",
    "in",
    "not_in",
    "greater_than",
    "greater_than_equal",
    "less_than",
    "less_than_equal",
    "like",
    "contains",
    "exists",
];

/// Run a query over `docs` and produce a paginated result.
pub fn execute_query(docs: &[Value], query: &QueryDescriptor) -> Result<FindResult, StoreError> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty());
    let search_fields = query.search_fields.as_deref().unwrap_or(&[]);

    let mut matched = Vec::new();
    for doc in docs {
        if let Some(filter) = &query.filter {
            if !matches_where(doc, filter)? {
                continue;
            }
        }
        if let Some(term) = search {
            if !matches_search(doc, term, search_fields) {
                continue;
            }
        }
        matched.push(doc);
    }

    if let Some(sort) = query.sort.as_deref().filter(|s| !s.trim().is_empty()) {
        sort_docs(&mut matched, sort);
    }

    let total_docs = matched.len() as u64;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let page = query.page.unwrap_or(1).max(1);

    let window: Box<dyn Iterator<Item = &Value>> = if limit == 0 {
        Box::new(matched.into_iter())
    } else {
        let skip = usize::try_from((page - 1).saturating_mul(limit)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Box::new(matched.into_iter().skip(skip).take(take))
    };

    let docs = match query.select.as_deref().filter(|fields| !fields.is_empty()) {
        Some(fields) => window.map(|doc| project(doc, fields)).collect(),
        None => window.cloned().collect(),
    };

    let pagination = tessera_api::Pagination::new(page, limit, total_docs);
    Ok(FindResult {
        docs,
        total_docs,
        page,
        total_pages: pagination.total_pages,
        limit,
    })
}

/// Evaluate a `where` clause against one document.
///
/// Top-level keys are ANDed. `and` / `or` take arrays of nested clauses.
/// Any other key is a dot path whose condition is either an operator object
/// (`{"greater_than": 5}`) or a bare value meaning `equals`.
pub fn matches_where(doc: &Value, filter: &Value) -> Result<bool, StoreError> {
    let Value::Object(clauses) = filter else {
        return Err(StoreError::InvalidQuery(format!(
            "`where` must be an object, got {filter}"
        )));
    };

    for (key, condition) in clauses {
        let holds = match key.as_str() {
            "and" => {
                let mut all = true;
                for nested in clause_list(condition)? {
                    if !matches_where(doc, nested)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "or" => {
                let mut any = false;
                for nested in clause_list(condition)? {
                    if matches_where(doc, nested)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            path => matches_condition(value_at_path(doc, path), condition)?,
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clause_list(condition: &Value) -> Result<&[Value], StoreError> {
    condition
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| StoreError::InvalidQuery("`and` / `or` expect an array".to_string()))
}

fn matches_condition(actual: Option<&Value>, condition: &Value) -> Result<bool, StoreError> {
    match condition {
        Value::Object(ops) if ops.keys().any(|k| OPERATORS.contains(&k.as_str())) => {
            for (op, operand) in ops {
                if !apply_operator(op, actual, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        literal => Ok(any_element(actual, |v| loose_eq(v, literal))),
    }
}

fn apply_operator(op: &str, actual: Option<&Value>, operand: &Value) -> Result<bool, StoreError> {
    let result = match op {
        "equals" => any_element(actual, |v| loose_eq(v, operand)),
        "not_equals" => !any_element(actual, |v| loose_eq(v, operand)),
        "in" => any_element(actual, |v| operand_list(operand).any(|o| loose_eq(v, o))),
        "not_in" => !any_element(actual, |v| operand_list(operand).any(|o| loose_eq(v, o))),
        "greater_than" => compares(actual, operand, |o| o == Ordering::Greater),
        "greater_than_equal" => compares(actual, operand, |o| o != Ordering::Less),
        "less_than" => compares(actual, operand, |o| o == Ordering::Less),
        "less_than_equal" => compares(actual, operand, |o| o != Ordering::Greater),
        "like" => {
            let needle = js_string(operand).to_lowercase();
            any_element(actual, |v| {
                let hay = text_of(v).to_lowercase();
                needle.split_whitespace().all(|word| hay.contains(word))
            })
        }
        "contains" => {
            let needle = js_string(operand).to_lowercase();
            any_element(actual, |v| text_of(v).to_lowercase().contains(&needle))
        }
        "exists" => {
            let wanted = matches!(operand, Value::Bool(true)) || operand.as_str() == Some("true");
            let present = actual.map(|v| !v.is_null()).unwrap_or(false);
            present == wanted
        }
        other => {
            return Err(StoreError::InvalidQuery(format!("unknown operator `{other}`")));
        }
    };
    Ok(result)
}

fn operand_list(operand: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match operand {
        Value::Array(items) => Box::new(items.iter()),
        single => Box::new(std::iter::once(single)),
    }
}

/// Array-valued fields match when any element matches.
fn any_element(actual: Option<&Value>, mut pred: impl FnMut(&Value) -> bool) -> bool {
    match actual {
        Some(Value::Array(items)) => items.iter().any(pred),
        Some(value) => pred(value),
        None => pred(&Value::Null),
    }
}

fn compares(actual: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    any_element(actual, |v| compare_values(v, operand).map(&accept).unwrap_or(false))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => js_string(other),
    }
}

/// Equality that tolerates the string/number mismatch of query-string input.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(_), Value::Number(_) | Value::Bool(_))
        | (Value::Number(_) | Value::Bool(_), Value::String(_)) => js_string(a) == js_string(b),
        _ => a == b,
    }
}

/// Ordering between two scalars of compatible type; `None` when incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.trim().parse::<f64>().ok()?),
        (Value::String(x), Value::Number(y)) => x.trim().parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        _ => None,
    }
}

/// Case-insensitive substring search across `fields`, or across every
/// top-level string field when `fields` is empty.
pub fn matches_search(doc: &Value, term: &str, fields: &[String]) -> bool {
    let needle = term.to_lowercase();
    let contains = |v: &Value| match v {
        Value::String(s) => s.to_lowercase().contains(&needle),
        Value::Number(_) => js_string(v).contains(&needle),
        _ => false,
    };
    if fields.is_empty() {
        doc.as_object()
            .map(|map| map.values().any(contains))
            .unwrap_or(false)
    } else {
        fields
            .iter()
            .filter_map(|field| value_at_path(doc, field))
            .any(contains)
    }
}

/// Stable multi-key sort. `sort` is a comma-separated list of dot paths,
/// each optionally prefixed with `-` for descending. Missing values sort first.
pub fn sort_docs(docs: &mut [&Value], sort: &str) {
    let keys: Vec<(&str, bool)> = sort
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| match k.strip_prefix('-') {
            Some(field) => (field, true),
            None => (k, false),
        })
        .collect();

    docs.sort_by(|a, b| {
        for (field, desc) in &keys {
            let ord = sort_cmp(value_at_path(a, field), value_at_path(b, field));
            let ord = if *desc { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or_else(|| js_string(x).cmp(&js_string(y))),
    }
}

fn project(doc: &Value, fields: &[String]) -> Value {
    let Some(source) = doc.as_object() else {
        return doc.clone();
    };
    let mut projected = Map::new();
    if let Some(id) = source.get("id") {
        projected.insert("id".to_string(), id.clone());
    }
    for field in fields {
        let top = field.split('.').next().unwrap_or(field);
        if let Some(value) = source.get(top) {
            projected.insert(top.to_string(), value.clone());
        }
    }
    Value::Object(projected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orders() -> Vec<Value> {
        vec![
            json!({"id": "1", "status": "paid", "total": 30, "tags": ["a", "b"], "customer": {"name": "Ada"}}),
            json!({"id": "2", "status": "pending", "total": 10, "tags": ["b"], "customer": {"name": "Brian"}}),
            json!({"id": "3", "status": "paid", "total": 20, "tags": [], "customer": {"name": "Cleo"}}),
        ]
    }

    fn ids(result: &FindResult) -> Vec<&str> {
        result.docs.iter().map(|d| d["id"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_where_operators() {
        let docs = orders();
        let q = |filter: Value| QueryDescriptor::new().with_where(filter).with_limit(0);

        let paid = execute_query(&docs, &q(json!({"status": {"equals": "paid"}}))).unwrap();
        assert_eq!(ids(&paid), vec!["1", "3"]);

        let bare = execute_query(&docs, &q(json!({"status": "pending"}))).unwrap();
        assert_eq!(ids(&bare), vec!["2"]);

        let big = execute_query(&docs, &q(json!({"total": {"greater_than_equal": 20}}))).unwrap();
        assert_eq!(ids(&big), vec!["1", "3"]);

        let tagged = execute_query(&docs, &q(json!({"tags": {"in": ["a"]}}))).unwrap();
        assert_eq!(ids(&tagged), vec!["1"]);

        let nested = execute_query(&docs, &q(json!({"customer.name": {"like": "bri"}}))).unwrap();
        assert_eq!(ids(&nested), vec!["2"]);

        let either = execute_query(
            &docs,
            &q(json!({"or": [{"status": {"equals": "pending"}}, {"total": {"equals": "20"}}]})),
        )
        .unwrap();
        assert_eq!(ids(&either), vec!["2", "3"]);
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let err = execute_query(
            &orders(),
            &QueryDescriptor::new().with_where(json!({"status": {"equals": "paid", "near": 1}})),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn test_sort_and_paginate() {
        let docs = orders();
        let result = execute_query(
            &docs,
            &QueryDescriptor::new().with_sort("-total").with_limit(2).with_page(2),
        )
        .unwrap();
        assert_eq!(ids(&result), vec!["2"]);
        assert_eq!(result.total_docs, 3);
        assert_eq!(result.total_pages, 2);

        let multi = execute_query(&docs, &QueryDescriptor::new().with_sort("status,-total")).unwrap();
        assert_eq!(ids(&multi), vec!["1", "3", "2"]);
    }

    #[test]
    fn test_default_limit_applies_when_unset() {
        let docs: Vec<Value> = (0..25).map(|i| json!({"id": i})).collect();
        let result = execute_query(&docs, &QueryDescriptor::new()).unwrap();
        assert_eq!(result.docs.len(), DEFAULT_LIMIT as usize);
        assert_eq!(result.total_docs, 25);

        let all = execute_query(&docs, &QueryDescriptor::new().with_limit(0)).unwrap();
        assert_eq!(all.docs.len(), 25);
    }

    #[test]
    fn test_search_and_select() {
        let docs = orders();
        let result = execute_query(
            &docs,
            &QueryDescriptor::new()
                .with_search("CLE", ["customer.name"])
                .with_select(["total"]),
        )
        .unwrap();
        assert_eq!(result.docs, vec![json!({"id": "3", "total": 20})]);
    }
}
