//! Index backend seam
//!
//! Both the Elasticsearch client and the in-memory index accept the same
//! request body: `{"query": .., "from": .., "size": .., "sort": [..]}`.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Insert or replace the document stored under `doc_id`
    async fn upsert(&self, index: &str, doc_id: &str, doc: &Value) -> Result<()>;

    /// Run a search and return the `_source` of each hit, in hit order
    async fn search(&self, index: &str, body: &Value) -> Result<Vec<Value>>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_is_object_safe() {
        fn _assert_object_safe(_: &dyn IndexBackend) {}
    }
}
