//! In-process index backend
//!
//! Stores documents per index and evaluates the subset of the Elasticsearch
//! query DSL the query builder emits: `match_all`, `term`, `match`, `range`
//! and `bool`. Used by tests and by dry runs that must not touch a cluster.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::IndexBackend;
use crate::error::{Error, Result};

/// Default `size` when the request body omits it
const DEFAULT_SIZE: usize = 10;

#[derive(Debug, Default)]
pub struct MemoryIndex {
    indices: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored document, if any
    pub async fn document(&self, index: &str, doc_id: &str) -> Option<Value> {
        let indices = self.indices.read().await;
        indices.get(index).and_then(|docs| docs.get(doc_id)).cloned()
    }

    pub async fn len(&self, index: &str) -> usize {
        let indices = self.indices.read().await;
        indices.get(index).map_or(0, BTreeMap::len)
    }

    pub async fn is_empty(&self, index: &str) -> bool {
        self.len(index).await == 0
    }

    /// Full copy of an index, keyed by document id
    pub async fn snapshot(&self, index: &str) -> BTreeMap<String, Value> {
        let indices = self.indices.read().await;
        indices.get(index).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl IndexBackend for MemoryIndex {
    async fn upsert(&self, index: &str, doc_id: &str, doc: &Value) -> Result<()> {
        if !doc.is_object() {
            return Err(Error::IndexWrite {
                index: index.to_string(),
                message: format!("document {} is not a JSON object", doc_id),
            });
        }

        let mut indices = self.indices.write().await;
        indices
            .entry(index.to_string())
            .or_default()
            .insert(doc_id.to_string(), doc.clone());

        debug!(index, doc_id, "Upserted document in memory");
        Ok(())
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Vec<Value>> {
        let search_error = |message: String| Error::SearchExecution {
            index: index.to_string(),
            message,
        };

        let query = body
            .get("query")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({"match_all": {}}));
        let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;
        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_SIZE, |s| s as usize);

        let indices = self.indices.read().await;
        let Some(docs) = indices.get(index) else {
            return Ok(Vec::new());
        };

        let mut hits = Vec::new();
        for doc in docs.values() {
            if matches(&query, doc).map_err(search_error)? {
                hits.push(doc);
            }
        }

        if let Some(sort) = body.get("sort") {
            let keys = sort_keys(sort).map_err(search_error)?;
            hits.sort_by(|a, b| compare_by_keys(&keys, a, b));
        }

        Ok(hits.into_iter().skip(from).take(size).cloned().collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Resolve a field, following dotted paths into objects
fn lookup<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    if let Some(value) = doc.get(field) {
        return Some(value);
    }
    field
        .split('.')
        .try_fold(doc, |current, segment| current.get(segment))
}

/// Values of a field; arrays contribute each element
fn field_values<'a>(doc: &'a Value, field: &str) -> Vec<&'a Value> {
    match lookup(doc, field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
    }
}

fn single_entry<'a>(
    clause: &'a Value,
    kind: &str,
) -> std::result::Result<(&'a String, &'a Value), String> {
    clause
        .as_object()
        .filter(|obj| obj.len() == 1)
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| format!("malformed {} clause: {}", kind, clause))
}

fn matches(query: &Value, doc: &Value) -> std::result::Result<bool, String> {
    let (kind, clause) = single_entry(query, "query")?;
    match kind.as_str() {
        "match_all" => Ok(true),
        "term" => {
            let (field, expected) = single_entry(clause, "term")?;
            let expected = expected.get("value").unwrap_or(expected);
            Ok(field_values(doc, field)
                .into_iter()
                .any(|v| json_equal(v, expected)))
        }
        "match" => {
            let (field, text) = single_entry(clause, "match")?;
            let text = text.get("query").unwrap_or(text);
            let wanted = tokenize(&scalar_text(text));
            if wanted.is_empty() {
                return Ok(false);
            }
            let present: Vec<String> = field_values(doc, field)
                .into_iter()
                .flat_map(|v| tokenize(&scalar_text(v)))
                .collect();
            Ok(wanted.iter().any(|t| present.contains(t)))
        }
        "range" => {
            let (field, bounds) = single_entry(clause, "range")?;
            let values = field_values(doc, field);
            Ok(values.into_iter().any(|v| within(v, bounds)))
        }
        "bool" => eval_bool(clause, doc),
        other => Err(format!("unsupported query clause '{}'", other)),
    }
}

fn clauses<'a>(clause: &'a Value, key: &str) -> &'a [Value] {
    clause
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn eval_bool(clause: &Value, doc: &Value) -> std::result::Result<bool, String> {
    let list = |key: &str| clauses(clause, key);

    for q in list("must").iter().chain(list("filter")) {
        if !matches(q, doc)? {
            return Ok(false);
        }
    }
    for q in list("must_not") {
        if matches(q, doc)? {
            return Ok(false);
        }
    }

    let should = list("should");
    if should.is_empty() {
        return Ok(true);
    }

    let has_required = !list("must").is_empty() || !list("filter").is_empty();
    let minimum = clause
        .get("minimum_should_match")
        .and_then(Value::as_u64)
        .map_or(if has_required { 0 } else { 1 }, |m| m as usize);

    let mut satisfied = 0;
    for q in should {
        if matches(q, doc)? {
            satisfied += 1;
        }
    }
    Ok(satisfied >= minimum)
}

fn within(value: &Value, bounds: &Value) -> bool {
    let check = |key: &str, accept: fn(Ordering) -> bool| match bounds.get(key) {
        None | Some(Value::Null) => true,
        Some(bound) => compare_values(value, bound).is_some_and(accept),
    };

    check("gte", |o| o != Ordering::Less)
        && check("gt", |o| o == Ordering::Greater)
        && check("lte", |o| o != Ordering::Greater)
        && check("lt", |o| o == Ordering::Less)
}

fn json_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

struct SortKey {
    field: String,
    descending: bool,
}

fn sort_keys(sort: &Value) -> std::result::Result<Vec<SortKey>, String> {
    let entries = sort
        .as_array()
        .ok_or_else(|| format!("sort must be an array: {}", sort))?;

    entries
        .iter()
        .map(|entry| match entry {
            Value::String(field) => Ok(SortKey {
                field: field.clone(),
                descending: false,
            }),
            Value::Object(_) => {
                let (field, spec) = single_entry(entry, "sort")?;
                let order = spec
                    .get("order")
                    .or(Some(spec))
                    .and_then(Value::as_str)
                    .unwrap_or("asc");
                Ok(SortKey {
                    field: field.clone(),
                    descending: order.eq_ignore_ascii_case("desc"),
                })
            }
            other => Err(format!("unsupported sort entry: {}", other)),
        })
        .collect()
}

/// Documents missing a sort value go last regardless of direction
fn compare_by_keys(keys: &[SortKey], a: &Value, b: &Value) -> Ordering {
    for key in keys {
        let left = lookup(a, &key.field).filter(|v| !v.is_null());
        let right = lookup(b, &key.field).filter(|v| !v.is_null());
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let natural = compare_values(x, y).unwrap_or(Ordering::Equal);
                if key.descending { natural.reverse() } else { natural }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
