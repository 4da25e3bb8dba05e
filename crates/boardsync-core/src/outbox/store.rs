//! Outbox event store
//!
//! Durable log of pending changes. Rows are never deleted; only the status,
//! retry, error and timestamp columns change after insertion.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::model::{EventStatus, FindPendingEvents, OutboxEvent, TargetType, UpdateType};
use crate::error::{Error, Result};

const SELECT_EVENT_COLUMNS: &str = "SELECT id, target_type, target_id, update_type, status, retry_count, error_message, updated_at, processed_at FROM outbox_events";

/// Storage operations the sync worker and operators need on the outbox
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Read WAIT events, oldest first, without claiming them
    async fn find_pending(&self, filter: FindPendingEvents) -> Result<Vec<OutboxEvent>>;

    /// Atomically move up to `filter.limit` WAIT events to PROCESSING and return them
    async fn claim_pending(&self, filter: FindPendingEvents) -> Result<Vec<OutboxEvent>>;

    /// Persist the mutable fields of an event
    async fn update(&self, event: &OutboxEvent) -> Result<OutboxEvent>;

    /// Persist several events in one transaction
    async fn update_batch(&self, events: &[OutboxEvent]) -> Result<()>;

    async fn get(&self, id: i64) -> Result<Option<OutboxEvent>>;

    /// Most recent events first, optionally filtered by status
    async fn list_recent(&self, status: Option<EventStatus>, limit: u32) -> Result<Vec<OutboxEvent>>;

    /// Move FAILED events with `retry_count < max_retries` back to WAIT
    async fn requeue_failed(&self, target_type: Option<TargetType>, max_retries: u32) -> Result<u64>;

    /// Move PROCESSING events left behind by an interrupted run back to WAIT
    async fn release_in_flight(&self, target_type: Option<TargetType>) -> Result<u64>;

    /// Move the given events back to WAIT if they are still PROCESSING
    async fn release_claimed(&self, ids: &[i64]) -> Result<u64>;

    async fn count_by_status(&self, status: EventStatus) -> Result<u64>;
}

/// SQLite-backed outbox store
#[derive(Debug, Clone)]
pub struct SqliteOutboxStore {
    pool: SqlitePool,
}

impl SqliteOutboxStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub(crate) fn row_to_event(row: &SqliteRow) -> Result<OutboxEvent> {
    let target_type: String = row.try_get("target_type")?;
    let update_type: String = row.try_get("update_type")?;
    let status: String = row.try_get("status")?;
    let retry_count: i64 = row.try_get("retry_count")?;

    Ok(OutboxEvent {
        id: row.try_get("id")?,
        target_type: TargetType::parse(&target_type).ok_or(Error::CorruptRow {
            column: "target_type",
            value: target_type.clone(),
        })?,
        target_id: row.try_get("target_id")?,
        update_type: UpdateType::parse(&update_type).ok_or(Error::CorruptRow {
            column: "update_type",
            value: update_type.clone(),
        })?,
        status: EventStatus::parse(&status).ok_or(Error::CorruptRow {
            column: "status",
            value: status.clone(),
        })?,
        retry_count: u32::try_from(retry_count).unwrap_or(u32::MAX),
        error_message: row.try_get("error_message")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        processed_at: row.try_get::<Option<DateTime<Utc>>, _>("processed_at")?,
    })
}

async fn update_event<'e, E>(executor: E, event: &OutboxEvent) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE outbox_events
        SET status = ?, retry_count = ?, error_message = ?, updated_at = ?, processed_at = ?
        WHERE id = ?
        "#,
    )
    .bind(event.status.as_str())
    .bind(i64::from(event.retry_count))
    .bind(&event.error_message)
    .bind(event.updated_at)
    .bind(event.processed_at)
    .bind(event.id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

fn pending_query(filter: &FindPendingEvents) -> String {
    match filter.target_type {
        Some(_) => format!(
            "{} WHERE status = 'WAIT' AND target_type = ? ORDER BY id ASC LIMIT ?",
            SELECT_EVENT_COLUMNS
        ),
        None => format!("{} WHERE status = 'WAIT' ORDER BY id ASC LIMIT ?", SELECT_EVENT_COLUMNS),
    }
}

#[async_trait]
impl OutboxStore for SqliteOutboxStore {
    async fn find_pending(&self, filter: FindPendingEvents) -> Result<Vec<OutboxEvent>> {
        let sql = pending_query(&filter);
        let mut query = sqlx::query(&sql);
        if let Some(target_type) = filter.target_type {
            query = query.bind(target_type.as_str());
        }
        let rows = query
            .bind(i64::from(filter.limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_event).collect()
    }

    async fn claim_pending(&self, filter: FindPendingEvents) -> Result<Vec<OutboxEvent>> {
        let mut tx = self.pool.begin().await?;

        let sql = pending_query(&filter);
        let mut query = sqlx::query(&sql);
        if let Some(target_type) = filter.target_type {
            query = query.bind(target_type.as_str());
        }
        let rows = query.bind(i64::from(filter.limit)).fetch_all(&mut *tx).await?;

        let mut claimed = Vec::with_capacity(rows.len());
        for row in &rows {
            let event = row_to_event(row)?.mark_processing();
            update_event(&mut *tx, &event).await?;
            claimed.push(event);
        }

        tx.commit().await?;

        if !claimed.is_empty() {
            debug!(count = claimed.len(), "Claimed pending outbox events");
        }
        Ok(claimed)
    }

    async fn update(&self, event: &OutboxEvent) -> Result<OutboxEvent> {
        let affected = update_event(&self.pool, event).await?;
        if affected == 0 {
            return Err(Error::OutboxEventNotFound(event.id));
        }
        Ok(event.clone())
    }

    async fn update_batch(&self, events: &[OutboxEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for event in events {
            if update_event(&mut *tx, event).await? == 0 {
                return Err(Error::OutboxEventNotFound(event.id));
            }
        }
        tx.commit().await?;

        debug!(count = events.len(), "Updated outbox events");
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<OutboxEvent>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_EVENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_event).transpose()
    }

    async fn list_recent(&self, status: Option<EventStatus>, limit: u32) -> Result<Vec<OutboxEvent>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "{} WHERE status = ? ORDER BY id DESC LIMIT ?",
                    SELECT_EVENT_COLUMNS
                ))
                .bind(status.as_str())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{} ORDER BY id DESC LIMIT ?", SELECT_EVENT_COLUMNS))
                    .bind(i64::from(limit))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(row_to_event).collect()
    }

    async fn requeue_failed(&self, target_type: Option<TargetType>, max_retries: u32) -> Result<u64> {
        let result = match target_type {
            Some(target_type) => {
                sqlx::query(
                    "UPDATE outbox_events SET status = 'WAIT', updated_at = ? WHERE status = 'FAILED' AND retry_count < ? AND target_type = ?",
                )
                .bind(Utc::now())
                .bind(i64::from(max_retries))
                .bind(target_type.as_str())
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE outbox_events SET status = 'WAIT', updated_at = ? WHERE status = 'FAILED' AND retry_count < ?",
                )
                .bind(Utc::now())
                .bind(i64::from(max_retries))
                .execute(&self.pool)
                .await?
            }
        };

        let requeued = result.rows_affected();
        info!(requeued, max_retries, "Requeued failed outbox events");
        Ok(requeued)
    }

    async fn release_in_flight(&self, target_type: Option<TargetType>) -> Result<u64> {
        let result = match target_type {
            Some(target_type) => {
                sqlx::query(
                    "UPDATE outbox_events SET status = 'WAIT', updated_at = ? WHERE status = 'PROCESSING' AND target_type = ?",
                )
                .bind(Utc::now())
                .bind(target_type.as_str())
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE outbox_events SET status = 'WAIT', updated_at = ? WHERE status = 'PROCESSING'",
                )
                .bind(Utc::now())
                .execute(&self.pool)
                .await?
            }
        };

        let released = result.rows_affected();
        if released > 0 {
            info!(released, "Released in-flight outbox events from an interrupted run");
        }
        Ok(released)
    }

    async fn release_claimed(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE outbox_events SET status = 'WAIT', updated_at = ? WHERE status = 'PROCESSING' AND id IN ({})",
            placeholders
        );
        let mut query = sqlx::query(&sql).bind(Utc::now());
        for id in ids {
            query = query.bind(*id);
        }
        let released = query.execute(&self.pool).await?.rows_affected();

        debug!(released, "Released claimed outbox events");
        Ok(released)
    }

    async fn count_by_status(&self, status: EventStatus) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM outbox_events WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::recorder::OutboxRecorder;
    use crate::storage::Database;

    async fn setup() -> (Database, SqliteOutboxStore) {
        let db = Database::in_memory().await.expect("Failed to create database");
        let store = SqliteOutboxStore::new(db.pool().clone());
        (db, store)
    }

    async fn record(db: &Database, target_type: TargetType, target_id: i64) -> OutboxEvent {
        let mut conn = db.pool().acquire().await.unwrap();
        OutboxRecorder::new()
            .record(&mut conn, target_type, target_id, UpdateType::Updated)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_find_pending_filters_and_orders() {
        let (db, store) = setup().await;
        let first = record(&db, TargetType::Job, 1).await;
        record(&db, TargetType::TechBlog, 2).await;
        let third = record(&db, TargetType::Job, 3).await;

        let pending = store
            .find_pending(FindPendingEvents::of_type(100, TargetType::Job))
            .await
            .unwrap();
        assert_eq!(pending.iter().map(|e| e.id).collect::<Vec<_>>(), vec![first.id, third.id]);

        let all = store.find_pending(FindPendingEvents::any(100)).await.unwrap();
        assert_eq!(all.len(), 3);

        let limited = store.find_pending(FindPendingEvents::any(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, first.id);
    }

    #[tokio::test]
    async fn test_claim_moves_events_to_processing() {
        let (db, store) = setup().await;
        record(&db, TargetType::Job, 1).await;
        record(&db, TargetType::Job, 2).await;

        let claimed = store
            .claim_pending(FindPendingEvents::of_type(10, TargetType::Job))
            .await
            .unwrap();
        assert_eq!(claimed.len(), 2);
        assert!(claimed.iter().all(|e| e.status == EventStatus::Processing));

        let again = store
            .claim_pending(FindPendingEvents::of_type(10, TargetType::Job))
            .await
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(store.count_by_status(EventStatus::Processing).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_persists_status_fields() {
        let (db, store) = setup().await;
        let event = record(&db, TargetType::Job, 42).await;

        store.update(&event.clone().mark_failed("JOB 42 not found")).await.unwrap();

        let stored = store.get(event.id).await.unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Failed);
        assert_eq!(stored.retry_count, 1);
        assert_eq!(stored.error_message.as_deref(), Some("JOB 42 not found"));
        assert!(stored.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_event_fails() {
        let (_db, store) = setup().await;
        let mut ghost = OutboxEvent::pending(TargetType::Job, 1, UpdateType::Created);
        ghost.id = 999;

        let err = store.update(&ghost).await.unwrap_err();
        assert!(matches!(err, Error::OutboxEventNotFound(999)));
    }

    #[tokio::test]
    async fn test_update_batch() {
        let (db, store) = setup().await;
        let a = record(&db, TargetType::Job, 1).await;
        let b = record(&db, TargetType::Job, 2).await;

        store
            .update_batch(&[a.clone().mark_completed(), b.clone().mark_completed()])
            .await
            .unwrap();

        assert_eq!(store.count_by_status(EventStatus::Completed).await.unwrap(), 2);
        assert_eq!(store.count_by_status(EventStatus::Wait).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_requeue_respects_max_retries() {
        let (db, store) = setup().await;
        let retryable = record(&db, TargetType::Job, 1).await;
        let exhausted = record(&db, TargetType::Job, 2).await;

        store.update(&retryable.clone().mark_failed("boom")).await.unwrap();
        let mut worn_out = exhausted.clone().mark_failed("boom");
        worn_out.retry_count = 3;
        store.update(&worn_out).await.unwrap();

        let requeued = store.requeue_failed(Some(TargetType::Job), 3).await.unwrap();
        assert_eq!(requeued, 1);

        let back = store.get(retryable.id).await.unwrap().unwrap();
        assert_eq!(back.status, EventStatus::Wait);
        assert_eq!(back.retry_count, 1);

        let stuck = store.get(exhausted.id).await.unwrap().unwrap();
        assert_eq!(stuck.status, EventStatus::Failed);
    }

    #[tokio::test]
    async fn test_release_in_flight() {
        let (db, store) = setup().await;
        record(&db, TargetType::Job, 1).await;
        store
            .claim_pending(FindPendingEvents::of_type(10, TargetType::Job))
            .await
            .unwrap();

        let released = store.release_in_flight(Some(TargetType::Job)).await.unwrap();
        assert_eq!(released, 1);
        assert_eq!(store.count_by_status(EventStatus::Wait).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_release_claimed_only_touches_listed_processing_events() {
        let (db, store) = setup().await;
        for id in 1..=3 {
            record(&db, TargetType::Job, id).await;
        }
        let claimed = store
            .claim_pending(FindPendingEvents::of_type(10, TargetType::Job))
            .await
            .unwrap();
        let done = store.update(&claimed[1].clone().mark_completed()).await.unwrap();

        let released = store.release_claimed(&[claimed[0].id, done.id]).await.unwrap();
        assert_eq!(released, 1);
        assert_eq!(store.get(claimed[0].id).await.unwrap().unwrap().status, EventStatus::Wait);
        assert_eq!(store.get(done.id).await.unwrap().unwrap().status, EventStatus::Completed);
        assert_eq!(store.count_by_status(EventStatus::Processing).await.unwrap(), 1);

        assert_eq!(store.release_claimed(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let (db, store) = setup().await;
        let a = record(&db, TargetType::Job, 1).await;
        let b = record(&db, TargetType::Job, 2).await;
        store.update(&a.clone().mark_completed()).await.unwrap();

        let recent = store.list_recent(None, 10).await.unwrap();
        assert_eq!(recent[0].id, b.id);

        let completed = store.list_recent(Some(EventStatus::Completed), 10).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, a.id);
    }
}
