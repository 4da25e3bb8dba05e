//! Job repository - SQLite persistence for the job aggregate
//!
//! Reads go through the pool. Writes take a `&mut SqliteConnection` so the
//! caller can run them on the same transaction as the outbox recorder.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::model::{
    CareerLevel, EmploymentType, Job, Popularity, PositionCategory, RemotePolicy, TechCategory,
};
use crate::error::{Error, Result};
use crate::sync::TargetFetcher;

const SELECT_JOB_COLUMNS: &str = r#"
    SELECT id, url, company, title, organization, one_line_summary, career_level,
           employment_type, position_category, remote_policy, tech_categories, locations,
           started_at, ended_at, is_open_ended, is_closed, experience, description,
           interview_process, compensation, popularity, deleted, created_at, updated_at
    FROM jobs
"#;

/// Job repository
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a job by id, including soft-deleted ones
    pub async fn get(&self, job_id: i64) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_JOB_COLUMNS))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_job).transpose()
    }

    /// Get a job by id on an open connection or transaction
    pub async fn get_on(&self, conn: &mut SqliteConnection, job_id: i64) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_JOB_COLUMNS))
            .bind(job_id)
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(row_to_job).transpose()
    }

    /// Insert a job and return its assigned id
    pub async fn insert(&self, conn: &mut SqliteConnection, job: &Job) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (
                url, company, title, organization, one_line_summary, career_level,
                employment_type, position_category, remote_policy, tech_categories, locations,
                started_at, ended_at, is_open_ended, is_closed, experience, description,
                interview_process, compensation, popularity, deleted, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.url)
        .bind(&job.company)
        .bind(&job.title)
        .bind(&job.organization)
        .bind(&job.one_line_summary)
        .bind(job.career_level.map(|v| v.as_str()))
        .bind(job.employment_type.map(|v| v.as_str()))
        .bind(job.position_category.map(|v| v.as_str()))
        .bind(job.remote_policy.map(|v| v.as_str()))
        .bind(serde_json::to_string(&job.tech_categories)?)
        .bind(serde_json::to_string(&job.locations)?)
        .bind(job.started_at)
        .bind(job.ended_at)
        .bind(job.is_open_ended)
        .bind(job.is_closed)
        .bind(to_json_column(&job.experience)?)
        .bind(to_json_column(&job.description)?)
        .bind(to_json_column(&job.interview_process)?)
        .bind(to_json_column(&job.compensation)?)
        .bind(to_json_column(&job.popularity)?)
        .bind(job.deleted)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrite every mutable column of an existing job
    pub async fn update(&self, conn: &mut SqliteConnection, job: &Job) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                url = ?, company = ?, title = ?, organization = ?, one_line_summary = ?,
                career_level = ?, employment_type = ?, position_category = ?, remote_policy = ?,
                tech_categories = ?, locations = ?, started_at = ?, ended_at = ?,
                is_open_ended = ?, is_closed = ?, experience = ?, description = ?,
                interview_process = ?, compensation = ?, popularity = ?, deleted = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&job.url)
        .bind(&job.company)
        .bind(&job.title)
        .bind(&job.organization)
        .bind(&job.one_line_summary)
        .bind(job.career_level.map(|v| v.as_str()))
        .bind(job.employment_type.map(|v| v.as_str()))
        .bind(job.position_category.map(|v| v.as_str()))
        .bind(job.remote_policy.map(|v| v.as_str()))
        .bind(serde_json::to_string(&job.tech_categories)?)
        .bind(serde_json::to_string(&job.locations)?)
        .bind(job.started_at)
        .bind(job.ended_at)
        .bind(job.is_open_ended)
        .bind(job.is_closed)
        .bind(to_json_column(&job.experience)?)
        .bind(to_json_column(&job.description)?)
        .bind(to_json_column(&job.interview_process)?)
        .bind(to_json_column(&job.compensation)?)
        .bind(to_json_column(&job.popularity)?)
        .bind(job.deleted)
        .bind(job.updated_at)
        .bind(job.job_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(job.job_id));
        }
        Ok(())
    }

    pub async fn update_popularity(
        &self,
        conn: &mut SqliteConnection,
        job_id: i64,
        popularity: &Popularity,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE jobs SET popularity = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(popularity)?)
            .bind(updated_at)
            .bind(job_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(job_id));
        }
        Ok(())
    }

    /// Flag a job as deleted; the row stays so the index can observe the deletion
    pub async fn mark_deleted(
        &self,
        conn: &mut SqliteConnection,
        job_id: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE jobs SET deleted = 1, updated_at = ? WHERE id = ?")
            .bind(updated_at)
            .bind(job_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(job_id));
        }
        Ok(())
    }
}

#[async_trait]
impl TargetFetcher for JobRepository {
    type Aggregate = Job;

    async fn fetch_by_id(&self, target_id: i64) -> Result<Option<Job>> {
        self.get(target_id).await
    }
}

fn not_found(job_id: i64) -> Error {
    Error::TargetNotFound {
        target_type: crate::outbox::TargetType::Job,
        target_id: job_id,
    }
}

fn to_json_column<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(Error::from)
}

fn from_json_column<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<Option<T>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(Error::from)
}

fn keyword_column<T>(
    row: &SqliteRow,
    column: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>> {
    let raw: Option<String> = row.try_get(column)?;
    match raw {
        None => Ok(None),
        Some(value) => parse(&value)
            .map(Some)
            .ok_or(Error::CorruptRow { column, value }),
    }
}

fn row_to_job(row: &SqliteRow) -> Result<Job> {
    let tech_categories: String = row.try_get("tech_categories")?;
    let locations: String = row.try_get("locations")?;

    Ok(Job {
        job_id: row.try_get("id")?,
        url: row.try_get("url")?,
        company: row.try_get("company")?,
        title: row.try_get("title")?,
        organization: row.try_get("organization")?,
        one_line_summary: row.try_get("one_line_summary")?,
        career_level: keyword_column(row, "career_level", CareerLevel::parse)?,
        employment_type: keyword_column(row, "employment_type", EmploymentType::parse)?,
        position_category: keyword_column(row, "position_category", PositionCategory::parse)?,
        remote_policy: keyword_column(row, "remote_policy", RemotePolicy::parse)?,
        tech_categories: serde_json::from_str::<Vec<TechCategory>>(&tech_categories)?,
        locations: serde_json::from_str(&locations)?,
        started_at: row.try_get("started_at")?,
        ended_at: row.try_get("ended_at")?,
        is_open_ended: row.try_get("is_open_ended")?,
        is_closed: row.try_get("is_closed")?,
        experience: from_json_column(row, "experience")?,
        description: from_json_column(row, "description")?,
        interview_process: from_json_column(row, "interview_process")?,
        compensation: from_json_column(row, "compensation")?,
        popularity: from_json_column(row, "popularity")?,
        deleted: row.try_get("deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::model::{ExperienceRequirement, NewJob};
    use crate::storage::Database;

    fn sample() -> Job {
        Job::from_new(
            NewJob {
                url: "https://example.com/jobs/1".to_string(),
                company: "ACME".to_string(),
                title: "Backend Engineer".to_string(),
                career_level: Some(CareerLevel::Mid),
                tech_categories: vec![TechCategory::Rust, TechCategory::Kubernetes],
                locations: vec!["Seoul".to_string()],
                experience: Some(ExperienceRequirement {
                    min_years: Some(3),
                    max_years: None,
                    required: true,
                }),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::in_memory().await.unwrap();
        let repo = JobRepository::new(db.pool().clone());

        let mut conn = db.pool().acquire().await.unwrap();
        let id = repo.insert(&mut conn, &sample()).await.unwrap();
        drop(conn);

        let job = repo.get(id).await.unwrap().expect("job should exist");
        assert_eq!(job.job_id, id);
        assert_eq!(job.career_level, Some(CareerLevel::Mid));
        assert_eq!(job.tech_categories, vec![TechCategory::Rust, TechCategory::Kubernetes]);
        assert_eq!(job.experience.as_ref().and_then(|e| e.min_years), Some(3));
        assert!(job.description.is_none());
        assert_eq!(job.popularity, Some(Popularity::default()));
    }

    #[tokio::test]
    async fn test_missing_job_is_none() {
        let db = Database::in_memory().await.unwrap();
        let repo = JobRepository::new(db.pool().clone());

        assert!(repo.fetch_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_deleted_job_is_still_fetchable() {
        let db = Database::in_memory().await.unwrap();
        let repo = JobRepository::new(db.pool().clone());

        let mut conn = db.pool().acquire().await.unwrap();
        let id = repo.insert(&mut conn, &sample()).await.unwrap();
        repo.mark_deleted(&mut conn, id, Utc::now()).await.unwrap();
        drop(conn);

        let job = repo.fetch_by_id(id).await.unwrap().unwrap();
        assert!(job.deleted);
    }

    #[tokio::test]
    async fn test_update_unknown_job_fails() {
        let db = Database::in_memory().await.unwrap();
        let repo = JobRepository::new(db.pool().clone());

        let mut conn = db.pool().acquire().await.unwrap();
        let mut job = sample();
        job.job_id = 99;
        let err = repo.update(&mut conn, &job).await.unwrap_err();
        assert!(matches!(err, Error::TargetNotFound { target_id: 99, .. }));
    }

    #[tokio::test]
    async fn test_corrupt_keyword_is_reported() {
        let db = Database::in_memory().await.unwrap();
        let repo = JobRepository::new(db.pool().clone());

        let mut conn = db.pool().acquire().await.unwrap();
        let id = repo.insert(&mut conn, &sample()).await.unwrap();
        sqlx::query("UPDATE jobs SET remote_policy = 'MARS' WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .unwrap();
        drop(conn);

        let err = repo.get(id).await.unwrap_err();
        assert!(matches!(err, Error::CorruptRow { column: "remote_policy", .. }));
    }
}
