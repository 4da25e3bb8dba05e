//! Outbox recorder
//!
//! Appends one WAIT event on the caller's open transaction. The event commits
//! or rolls back together with the domain mutation that produced it.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;

use super::model::{OutboxEvent, TargetType, UpdateType};
use crate::error::Result;

/// Records outbox events inside an existing transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct OutboxRecorder;

impl OutboxRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Insert a WAIT event for `target_id` using `conn`
    ///
    /// Pass `&mut *tx` from an open `sqlx::Transaction`. Duplicate events for
    /// the same target are allowed; the worker converges on the latest state.
    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        target_type: TargetType,
        target_id: i64,
        update_type: UpdateType,
    ) -> Result<OutboxEvent> {
        let mut event = OutboxEvent::pending(target_type, target_id, update_type);
        event.updated_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO outbox_events (target_type, target_id, update_type, status, retry_count, updated_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(target_type.as_str())
        .bind(target_id)
        .bind(update_type.as_str())
        .bind(event.status.as_str())
        .bind(event.updated_at)
        .execute(&mut *conn)
        .await?;

        event.id = result.last_insert_rowid();

        info!(
            event_id = event.id,
            target_type = %target_type,
            target_id,
            update_type = %update_type,
            "Recorded outbox event"
        );

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::model::EventStatus;
    use crate::outbox::store::{OutboxStore, SqliteOutboxStore};
    use crate::storage::Database;

    #[tokio::test]
    async fn test_record_inside_committed_transaction() {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteOutboxStore::new(db.pool().clone());

        let mut tx = db.pool().begin().await.unwrap();
        let event = OutboxRecorder::new()
            .record(&mut tx, TargetType::Job, 42, UpdateType::Created)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(event.id > 0);
        let stored = store.get(event.id).await.unwrap().unwrap();
        assert_eq!(stored.target_id, 42);
        assert_eq!(stored.status, EventStatus::Wait);
        assert_eq!(stored.update_type, UpdateType::Created);
        assert_eq!(stored.retry_count, 0);
    }

    #[tokio::test]
    async fn test_rollback_discards_event() {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteOutboxStore::new(db.pool().clone());

        let mut tx = db.pool().begin().await.unwrap();
        OutboxRecorder::new()
            .record(&mut tx, TargetType::Job, 42, UpdateType::Updated)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.count_by_status(EventStatus::Wait).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicates_are_permitted() {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteOutboxStore::new(db.pool().clone());
        let recorder = OutboxRecorder::new();

        let mut conn = db.pool().acquire().await.unwrap();
        let first = recorder
            .record(&mut conn, TargetType::Job, 7, UpdateType::Updated)
            .await
            .unwrap();
        let second = recorder
            .record(&mut conn, TargetType::Job, 7, UpdateType::Updated)
            .await
            .unwrap();
        drop(conn);

        assert_ne!(first.id, second.id);
        assert_eq!(store.count_by_status(EventStatus::Wait).await.unwrap(), 2);
    }
}
