//! Outbox - durable change log between the primary store and the search index
//!
//! Writers append events with [`OutboxRecorder`] inside their own transaction;
//! the sync worker drains them through [`OutboxStore`].

pub mod model;
pub mod recorder;
pub mod store;

pub use model::{EventStatus, FindPendingEvents, OutboxEvent, TargetType, UpdateType};
pub use recorder::OutboxRecorder;
pub use store::{OutboxStore, SqliteOutboxStore};
