//! Job writer - domain mutations paired with their outbox events
//!
//! Every mutation opens one transaction, writes the job row, records the
//! matching outbox event and commits. A failure anywhere rolls back both.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::model::{Job, NewJob, Popularity};
use super::repository::JobRepository;
use crate::error::{Error, Result};
use crate::outbox::{OutboxRecorder, TargetType, UpdateType};

/// Transactional writer for jobs
#[derive(Debug, Clone)]
pub struct JobWriter {
    pool: SqlitePool,
    repository: JobRepository,
    recorder: OutboxRecorder,
}

impl JobWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repository: JobRepository::new(pool.clone()),
            recorder: OutboxRecorder::new(),
            pool,
        }
    }

    /// Store a new job and record a CREATED event
    pub async fn create(&self, new: NewJob) -> Result<Job> {
        let mut job = Job::from_new(new, Utc::now());

        let mut tx = self.pool.begin().await?;
        job.job_id = self.repository.insert(&mut tx, &job).await?;
        self.recorder
            .record(&mut tx, TargetType::Job, job.job_id, UpdateType::Created)
            .await?;
        tx.commit().await?;

        info!(job_id = job.job_id, company = %job.company, "Created job");
        Ok(job)
    }

    /// Overwrite a job and record an UPDATED event
    pub async fn update(&self, job: Job) -> Result<Job> {
        let job = Job {
            updated_at: Utc::now(),
            ..job
        };

        let mut tx = self.pool.begin().await?;
        self.repository.update(&mut tx, &job).await?;
        self.recorder
            .record(&mut tx, TargetType::Job, job.job_id, UpdateType::Updated)
            .await?;
        tx.commit().await?;

        info!(job_id = job.job_id, "Updated job");
        Ok(job)
    }

    /// Apply a change to the popularity counters and record a POPULARITY_ONLY event
    pub async fn update_popularity<F>(&self, job_id: i64, change: F) -> Result<Job>
    where
        F: FnOnce(Popularity) -> Popularity + Send,
    {
        let mut tx = self.pool.begin().await?;
        let current = self
            .repository
            .get_on(&mut tx, job_id)
            .await?
            .ok_or(Error::TargetNotFound {
                target_type: TargetType::Job,
                target_id: job_id,
            })?;

        let popularity = change(current.popularity_or_default());
        let job = current.with_popularity(popularity);

        self.repository
            .update_popularity(&mut tx, job_id, &popularity, job.updated_at)
            .await?;
        self.recorder
            .record(&mut tx, TargetType::Job, job_id, UpdateType::PopularityOnly)
            .await?;
        tx.commit().await?;

        info!(job_id, view_count = popularity.view_count, "Updated job popularity");
        Ok(job)
    }

    /// Soft-delete a job and record a DELETED event
    pub async fn soft_delete(&self, job_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.repository.mark_deleted(&mut tx, job_id, Utc::now()).await?;
        self.recorder
            .record(&mut tx, TargetType::Job, job_id, UpdateType::Deleted)
            .await?;
        tx.commit().await?;

        info!(job_id, "Soft-deleted job");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::{EventStatus, FindPendingEvents, OutboxStore, SqliteOutboxStore};
    use crate::storage::Database;

    fn new_job() -> NewJob {
        NewJob {
            url: "https://example.com/jobs/7".to_string(),
            company: "ACME".to_string(),
            title: "Platform Engineer".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_each_mutation_records_one_event() {
        let db = Database::in_memory().await.unwrap();
        let writer = JobWriter::new(db.pool().clone());
        let outbox = SqliteOutboxStore::new(db.pool().clone());

        let job = writer.create(new_job()).await.unwrap();
        let job = writer
            .update(Job {
                title: "Senior Platform Engineer".to_string(),
                ..job
            })
            .await
            .unwrap();
        writer
            .update_popularity(job.job_id, |p| p.increment_view_count(1))
            .await
            .unwrap();
        writer.soft_delete(job.job_id).await.unwrap();

        let events = outbox
            .find_pending(FindPendingEvents::of_type(10, TargetType::Job))
            .await
            .unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.update_type).collect();
        assert_eq!(
            kinds,
            vec![
                UpdateType::Created,
                UpdateType::Updated,
                UpdateType::PopularityOnly,
                UpdateType::Deleted
            ]
        );
        assert!(events.iter().all(|e| e.target_id == job.job_id));
        assert!(events.iter().all(|e| e.status == EventStatus::Wait));
    }

    #[tokio::test]
    async fn test_failed_mutation_records_nothing() {
        let db = Database::in_memory().await.unwrap();
        let writer = JobWriter::new(db.pool().clone());
        let outbox = SqliteOutboxStore::new(db.pool().clone());

        let err = writer.soft_delete(42).await.unwrap_err();
        assert!(matches!(err, Error::TargetNotFound { target_id: 42, .. }));

        let err = writer
            .update_popularity(42, |p| p.increment_like_count())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TargetNotFound { .. }));

        assert_eq!(outbox.count_by_status(EventStatus::Wait).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_popularity_change_is_persisted() {
        let db = Database::in_memory().await.unwrap();
        let writer = JobWriter::new(db.pool().clone());
        let repo = JobRepository::new(db.pool().clone());

        let job = writer.create(new_job()).await.unwrap();
        writer
            .update_popularity(job.job_id, |p| p.increment_like_count().increment_view_count(5))
            .await
            .unwrap();

        let stored = repo.get(job.job_id).await.unwrap().unwrap();
        let popularity = stored.popularity.unwrap();
        assert_eq!(popularity.like_count, 1);
        assert_eq!(popularity.view_count, 5);
    }
}
