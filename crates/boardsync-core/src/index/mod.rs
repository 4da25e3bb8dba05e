//! Search index side of the pipeline
//!
//! - `field`: logical index fields and their query types
//! - `document` / `mapper`: aggregate → flat document projection
//! - `indexer`: validated upserts by deterministic id
//! - `backend`, `elasticsearch`, `memory`: where documents are stored and searched

pub mod backend;
pub mod document;
pub mod elasticsearch;
pub mod field;
pub mod indexer;
pub mod mapper;
pub mod memory;

pub use backend::IndexBackend;
pub use document::{IndexDocument, JobDoc, PopularityDoc, doc_id_for};
pub use elasticsearch::{ElasticsearchClient, ElasticsearchClientBuilder};
pub use field::{IndexField, JobIndexField, QueryType};
pub use indexer::DocIndexer;
pub use mapper::{DocMapper, JobDocMapper};
pub use memory::MemoryIndex;
