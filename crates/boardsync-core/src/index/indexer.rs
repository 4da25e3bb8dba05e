//! Document indexer - validates documents and upserts them by id

use std::sync::Arc;

use tracing::{debug, warn};

use super::backend::IndexBackend;
use super::document::IndexDocument;
use crate::error::{Error, Result};

/// Writes documents of one index through a backend
#[derive(Clone)]
pub struct DocIndexer {
    backend: Arc<dyn IndexBackend>,
    index: String,
}

impl std::fmt::Debug for DocIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocIndexer")
            .field("index", &self.index)
            .finish()
    }
}

impl DocIndexer {
    pub fn new(backend: Arc<dyn IndexBackend>, index: impl Into<String>) -> Self {
        Self {
            backend,
            index: index.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// A document is writable only with a non-blank id
    pub fn validate<D: IndexDocument>(&self, doc: &D) -> bool {
        !doc.doc_id().trim().is_empty()
    }

    /// Insert or replace `doc` under its deterministic id
    pub async fn index<D: IndexDocument>(&self, doc: &D) -> Result<()> {
        if !self.validate(doc) {
            warn!(index = %self.index, "Rejected document without an id");
            return Err(Error::InvalidDocument(
                "document id must not be empty".to_string(),
            ));
        }

        let body = serde_json::to_value(doc)?;
        self.backend.upsert(&self.index, doc.doc_id(), &body).await?;

        debug!(index = %self.index, doc_id = doc.doc_id(), "Indexed document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Note {
        doc_id: String,
        body: String,
    }

    impl IndexDocument for Note {
        fn doc_id(&self) -> &str {
            &self.doc_id
        }
    }

    #[tokio::test]
    async fn test_index_and_replace() {
        let memory = Arc::new(MemoryIndex::new());
        let indexer = DocIndexer::new(memory.clone(), "notes");

        for body in ["first", "second"] {
            indexer
                .index(&Note {
                    doc_id: "note_1".to_string(),
                    body: body.to_string(),
                })
                .await
                .unwrap();
        }

        assert_eq!(memory.len("notes").await, 1);
        assert_eq!(memory.document("notes", "note_1").await.unwrap()["body"], "second");
    }

    #[tokio::test]
    async fn test_blank_id_is_rejected() {
        let memory = Arc::new(MemoryIndex::new());
        let indexer = DocIndexer::new(memory.clone(), "notes");
        let note = Note {
            doc_id: "  ".to_string(),
            body: "orphan".to_string(),
        };

        assert!(!indexer.validate(&note));
        assert!(matches!(indexer.index(&note).await, Err(Error::InvalidDocument(_))));
        assert!(memory.is_empty("notes").await);
    }
}
