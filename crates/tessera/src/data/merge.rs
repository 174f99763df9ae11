//! Combining per-source results and applying transforms

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

use tessera_api::value::{js_string, json_number, to_number, value_at_path};
use tessera_api::{Envelope, MergeStrategy, SourceDescriptor, TransformDescriptor, TransformKind};

use super::fetcher::RawResult;

/// Merge fetched results into the context entries a `dataFetch` node exposes.
///
/// `union` yields a single entry under `prefix`. `separate` yields one entry
/// per successful source (its `dataKey`, or `{prefix}_{index}`) followed by an
/// entry under `prefix` holding all of them as an object. Failed sources are
/// left out of both.
pub fn merge(
    results: &[RawResult],
    sources: &[SourceDescriptor],
    strategy: MergeStrategy,
    transform: &TransformDescriptor,
    prefix: &str,
) -> IndexMap<String, Envelope> {
    let mut entries = IndexMap::new();
    match strategy {
        MergeStrategy::Union => {
            let mut docs = Vec::new();
            let mut total = 0u64;
            let mut raw = Vec::new();
            for payload in results.iter().filter_map(RawResult::payload) {
                total += payload.total();
                docs.extend(payload.docs.iter().cloned());
                raw.push(payload.raw.clone());
            }
            let mut envelope = apply_transform(docs, Some(total), transform);
            envelope.raw = Some(Value::Array(raw));
            entries.insert(prefix.to_string(), envelope);
        }
        MergeStrategy::Separate => {
            let mut combined = Map::new();
            for (index, result) in results.iter().enumerate() {
                let key = sources
                    .get(index)
                    .and_then(|s| s.data_key.as_deref())
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{prefix}_{index}"));
                // failed sources were logged by the fetcher and contribute nothing
                let RawResult::Fetched(payload) = result else {
                    continue;
                };
                let mut envelope = apply_transform(payload.docs.clone(), payload.total_docs, transform);
                envelope.raw = Some(payload.raw.clone());
                combined.insert(
                    key.clone(),
                    serde_json::to_value(&envelope).unwrap_or(Value::Null),
                );
                entries.insert(key, envelope);
            }
            entries.insert(prefix.to_string(), Envelope::ready(Value::Object(combined)));
        }
    }
    entries
}

/// Apply a transform to a document list.
///
/// `total_docs` is the collaborator-reported total; when absent the list
/// length is used. The returned envelope is never loading and always carries
/// `docs`.
pub fn apply_transform(
    docs: Vec<Value>,
    total_docs: Option<u64>,
    transform: &TransformDescriptor,
) -> Envelope {
    let count = total_docs.unwrap_or(docs.len() as u64);
    let field = transform.field.as_deref().filter(|f| !f.is_empty());
    let mut envelope = Envelope::ready(Value::Null);

    match transform.kind {
        TransformKind::None => {
            envelope.count = Some(count);
            envelope.data = Value::Array(docs.clone());
        }
        TransformKind::Count => {
            envelope.count = Some(count);
            envelope.data = Value::from(count);
            envelope.value = Some(Value::from(count));
        }
        TransformKind::Sum => {
            let sum = sum_field(&docs, field, "sum");
            envelope.sum = Some(sum);
            envelope.data = json_number(sum);
            envelope.value = Some(json_number(sum));
        }
        TransformKind::Average => {
            let sum = sum_field(&docs, field, "average");
            let average = if docs.is_empty() {
                0.0
            } else {
                sum / docs.len() as f64
            };
            envelope.sum = Some(sum);
            envelope.average = Some(average);
            envelope.data = json_number(average);
            envelope.value = Some(json_number(average));
        }
        TransformKind::First | TransformKind::Last => {
            let picked = if transform.kind == TransformKind::First {
                docs.first()
            } else {
                docs.last()
            };
            let picked = picked.cloned().unwrap_or(Value::Null);
            envelope.data = picked.clone();
            envelope.value = Some(picked);
        }
        TransformKind::GroupBy => {
            let grouped = group_by(&docs, field);
            envelope.data = grouped.clone();
            envelope.value = Some(grouped);
        }
    }

    envelope.docs = Some(docs);
    envelope
}

fn sum_field(docs: &[Value], field: Option<&str>, transform: &str) -> f64 {
    let Some(field) = field else {
        warn!(transform, "Transform has no field, defaulting to 0");
        return 0.0;
    };
    docs.iter()
        .map(|doc| value_at_path(doc, field).map(to_number).unwrap_or(0.0))
        .sum()
}

fn group_by(docs: &[Value], field: Option<&str>) -> Value {
    let Some(field) = field else {
        warn!(transform = "groupBy", "Transform has no field, defaulting to empty groups");
        return Value::Object(Map::new());
    };
    let mut groups: IndexMap<String, Vec<Value>> = IndexMap::new();
    for doc in docs {
        let key = match value_at_path(doc, field) {
            None | Some(Value::Null) => "undefined".to_string(),
            Some(value) => js_string(value),
        };
        groups.entry(key).or_default().push(doc.clone());
    }
    Value::Object(
        groups
            .into_iter()
            .map(|(key, members)| (key, Value::Array(members)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fetcher::SourcePayload;
    use serde_json::json;

    fn fetched(docs: Vec<Value>, total: Option<u64>) -> RawResult {
        RawResult::Fetched(SourcePayload {
            docs,
            total_docs: total,
            raw: Value::Null,
        })
    }

    fn xs() -> Vec<Value> {
        vec![json!({"x": 1}), json!({"x": 2}), json!({"x": 3})]
    }

    #[test]
    fn test_transform_values() {
        let sum = apply_transform(xs(), None, &TransformDescriptor::on(TransformKind::Sum, "x"));
        assert_eq!(sum.value, Some(json!(6)));

        let average = apply_transform(xs(), None, &TransformDescriptor::on(TransformKind::Average, "x"));
        assert_eq!(average.value, Some(json!(2)));

        let count = apply_transform(xs(), None, &TransformDescriptor::new(TransformKind::Count));
        assert_eq!(count.value, Some(json!(3)));

        let grouped = apply_transform(
            vec![json!({"x": "a"}), json!({"x": "a"}), json!({"x": "b"})],
            None,
            &TransformDescriptor::on(TransformKind::GroupBy, "x"),
        );
        let groups = grouped.value.unwrap();
        assert_eq!(groups["a"].as_array().unwrap().len(), 2);
        assert_eq!(groups["b"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_count_prefers_reported_total() {
        let count = apply_transform(xs(), Some(120), &TransformDescriptor::new(TransformKind::Count));
        assert_eq!(count.value, Some(json!(120)));
        assert_eq!(count.docs.unwrap().len(), 3);
    }

    #[test]
    fn test_permissive_numbers_and_empty_average() {
        let docs = vec![json!({"x": "4"}), json!({"x": "n/a"}), json!({}), json!({"x": null})];
        let sum = apply_transform(docs, None, &TransformDescriptor::on(TransformKind::Sum, "x"));
        assert_eq!(sum.value, Some(json!(4)));

        let empty = apply_transform(vec![], None, &TransformDescriptor::on(TransformKind::Average, "x"));
        assert_eq!(empty.value, Some(json!(0)));
    }

    #[test]
    fn test_missing_field_defaults() {
        let sum = apply_transform(xs(), None, &TransformDescriptor::new(TransformKind::Sum));
        assert_eq!(sum.value, Some(json!(0)));
        let groups = apply_transform(xs(), None, &TransformDescriptor::new(TransformKind::GroupBy));
        assert_eq!(groups.value, Some(json!({})));
    }

    #[test]
    fn test_group_order_and_undefined_key() {
        let docs = vec![json!({"s": "b"}), json!({}), json!({"s": "a"}), json!({"s": "b"})];
        let groups = apply_transform(docs, None, &TransformDescriptor::on(TransformKind::GroupBy, "s"));
        let keys: Vec<&String> = groups.value.as_ref().unwrap().as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "undefined", "a"]);
    }

    #[test]
    fn test_first_last_and_none() {
        let first = apply_transform(xs(), None, &TransformDescriptor::new(TransformKind::First));
        assert_eq!(first.value, Some(json!({"x": 1})));
        let last = apply_transform(vec![], None, &TransformDescriptor::new(TransformKind::Last));
        assert_eq!(last.value, Some(Value::Null));

        let none = apply_transform(xs(), Some(9), &TransformDescriptor::default());
        assert_eq!(none.data, Value::Array(xs()));
        assert_eq!(none.count, Some(9));
        assert_eq!(none.value, None);
        assert!(!none.loading);
    }

    #[test]
    fn test_union_concatenates_and_sums_totals() {
        let results = vec![
            fetched(vec![json!({"id": 1}), json!({"id": 2})], Some(10)),
            fetched(vec![json!({"id": 3})], None),
            RawResult::Failed {
                error: "boom".into(),
                source: "collection:x".into(),
            },
        ];
        let sources = vec![
            SourceDescriptor::collection("a"),
            SourceDescriptor::collection("b"),
            SourceDescriptor::collection("x"),
        ];
        let entries = merge(
            &results,
            &sources,
            MergeStrategy::Union,
            &TransformDescriptor::default(),
            "feed",
        );
        assert_eq!(entries.len(), 1);
        let feed = &entries["feed"];
        assert_eq!(feed.docs.as_ref().unwrap().len(), 3);
        assert_eq!(feed.count, Some(11));
        assert_eq!(feed.error, None);
    }

    #[test]
    fn test_separate_keys_by_data_key_or_index() {
        let results = vec![
            fetched(vec![json!({"x": 1}), json!({"x": 4})], None),
            fetched(vec![json!({"x": 10})], None),
        ];
        let sources = vec![
            SourceDescriptor::collection("orders").with_data_key("orders"),
            SourceDescriptor::collection("refunds"),
        ];
        let entries = merge(
            &results,
            &sources,
            MergeStrategy::Separate,
            &TransformDescriptor::on(TransformKind::Sum, "x"),
            "stats",
        );
        let keys: Vec<&str> = entries.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["orders", "stats_1", "stats"]);
        assert_eq!(entries["orders"].value, Some(json!(5)));
        assert_eq!(entries["stats_1"].value, Some(json!(10)));
        assert_eq!(entries["stats"].data["orders"]["value"], json!(5));
    }

    #[test]
    fn test_separate_leaves_out_failed_sources() {
        let results = vec![
            fetched(vec![json!({"x": 2})], None),
            RawResult::Failed {
                error: "boom".into(),
                source: "collection:b".into(),
            },
        ];
        let sources = vec![
            SourceDescriptor::collection("a").with_data_key("a"),
            SourceDescriptor::collection("b").with_data_key("b"),
        ];
        let entries = merge(
            &results,
            &sources,
            MergeStrategy::Separate,
            &TransformDescriptor::new(TransformKind::Count),
            "stats",
        );
        let keys: Vec<&str> = entries.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "stats"]);
        assert_eq!(entries["stats"].data, json!({"a": entries["a"]}));
        assert!(entries["stats"].data.get("b").is_none());
    }
}
