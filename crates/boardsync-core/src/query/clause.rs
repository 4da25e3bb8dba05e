//! Index query tree and its Elasticsearch JSON rendering

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

/// Boolean clause a fragment is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoolType {
    /// AND, contributes to scoring
    Must,
    /// OR, at least one must match
    Should,
    /// AND, no scoring
    Filter,
}

/// A composed index query
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    Term {
        field: String,
        value: Value,
    },
    Match {
        field: String,
        query: Value,
    },
    Range {
        field: String,
        gte: Option<Value>,
        lte: Option<Value>,
    },
    Bool(BoolQuery),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub filter: Vec<Query>,
    pub minimum_should_match: Option<u32>,
}

impl Query {
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Query::Match { field, query } => json!({ "match": { field.as_str(): query } }),
            Query::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".to_string(), gte.clone());
                }
                if let Some(lte) = lte {
                    bounds.insert("lte".to_string(), lte.clone());
                }
                json!({ "range": { field.as_str(): bounds } })
            }
            Query::Bool(b) => {
                let mut body = Map::new();
                for (key, clauses) in [("must", &b.must), ("filter", &b.filter), ("should", &b.should)] {
                    if !clauses.is_empty() {
                        body.insert(
                            key.to_string(),
                            Value::Array(clauses.iter().map(Query::to_json).collect()),
                        );
                    }
                }
                if let Some(minimum) = b.minimum_should_match {
                    body.insert("minimum_should_match".to_string(), json!(minimum));
                }
                json!({ "bool": body })
            }
        }
    }

    /// Stable textual form used to order fragments
    pub fn canonical(&self) -> String {
        self.to_json().to_string()
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// A fragment tagged with the clause it belongs in
#[derive(Debug, Clone, PartialEq)]
pub struct QueryWithBoolType {
    pub query: Query,
    pub bool_type: BoolType,
}

impl QueryWithBoolType {
    pub fn new(query: Query, bool_type: BoolType) -> Self {
        Self { query, bool_type }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_and_match_json() {
        let term = Query::Term {
            field: "company".to_string(),
            value: json!("ACME"),
        };
        assert_eq!(term.to_json(), json!({"term": {"company": "ACME"}}));

        let matched = Query::Match {
            field: "title".to_string(),
            query: json!("rust engineer"),
        };
        assert_eq!(matched.to_json(), json!({"match": {"title": "rust engineer"}}));
    }

    #[test]
    fn test_range_omits_absent_bounds() {
        let range = Query::Range {
            field: "max_years".to_string(),
            gte: None,
            lte: Some(json!("5")),
        };
        assert_eq!(range.to_json(), json!({"range": {"max_years": {"lte": "5"}}}));
    }

    #[test]
    fn test_bool_omits_empty_clauses() {
        let query = Query::Bool(BoolQuery {
            filter: vec![Query::Term {
                field: "deleted".to_string(),
                value: json!(false),
            }],
            ..Default::default()
        });
        assert_eq!(
            query.to_json(),
            json!({"bool": {"filter": [{"term": {"deleted": false}}]}})
        );
    }

    #[test]
    fn test_serializes_as_json_dsl() {
        let text = serde_json::to_string(&Query::MatchAll).unwrap();
        assert_eq!(text, r#"{"match_all":{}}"#);
    }
}
