//! Search executor - sends a composed query to an index backend

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::clause::Query;
use crate::error::{Error, Result};
use crate::index::IndexBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Sort on one field; documents without the field come last
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOption {
    pub field: String,
    pub order: SortOrder,
}

impl SortOption {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ self.field.as_str(): { "order": self.order.as_str(), "missing": "_last" } })
    }
}

/// Executes queries and deserializes hit sources
#[derive(Clone)]
pub struct SearchQueryExecutor {
    backend: Arc<dyn IndexBackend>,
}

impl std::fmt::Debug for SearchQueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchQueryExecutor").finish_non_exhaustive()
    }
}

impl SearchQueryExecutor {
    pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
        Self { backend }
    }

    /// Request body sent to the backend
    pub fn request_body(query: &Query, offset: u32, size: u32, sort: Option<&SortOption>) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), query.to_json());
        body.insert("from".to_string(), json!(offset));
        body.insert("size".to_string(), json!(size));
        if let Some(sort) = sort {
            body.insert("sort".to_string(), json!([sort.to_json()]));
        }
        Value::Object(body)
    }

    /// Run `query` and return at most `size` typed hits starting at `offset`
    ///
    /// Any transport or deserialization failure becomes
    /// [`Error::SearchExecution`]; nothing is retried.
    pub async fn search<T: DeserializeOwned>(
        &self,
        index: &str,
        query: &Query,
        offset: u32,
        size: u32,
        sort: Option<&SortOption>,
    ) -> Result<Vec<T>> {
        let body = Self::request_body(query, offset, size, sort);
        debug!(index, body = %body, "Executing search");

        let sources = self.backend.search(index, &body).await.map_err(|e| match e {
            e @ Error::SearchExecution { .. } => e,
            other => Error::SearchExecution {
                index: index.to_string(),
                message: other.to_string(),
            },
        })?;

        sources
            .into_iter()
            .map(|source| {
                serde_json::from_value(source).map_err(|e| Error::SearchExecution {
                    index: index.to_string(),
                    message: format!("Failed to deserialize hit: {}", e),
                })
            })
            .collect()
    }
}
