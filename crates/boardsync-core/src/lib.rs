//! Boardsync Core Library
//!
//! This crate keeps the job board's search index eventually consistent with
//! the primary store, and builds index queries from structured search requests:
//! - Outbox (event log + transactional recorder)
//! - Job aggregate, repository and writer (primary-store side)
//! - Index documents, mapper, indexer and backends (Elasticsearch, in-memory)
//! - Generic query building, registries and pagination
//! - Sync worker and its no-overlap scheduler
//! - Storage (SQLite) and configuration

pub mod config;
pub mod error;
pub mod index;
pub mod job;
pub mod outbox;
pub mod query;
pub mod search;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::outbox::{EventStatus, OutboxEvent, TargetType, UpdateType};
    pub use crate::query::{SearchCommand, SearchElement};
}
