//! Database migrations
//!
//! Versioned SQLite schema for the primary store. Migrations are applied
//! automatically on database connection.

use sqlx::SqlitePool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: Jobs table
///
/// Value objects (experience, description, interview process, compensation,
/// popularity) are stored as nullable JSON columns; a NULL column means the
/// aggregate has no such sub-structure.
const MIGRATION_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL,
        company TEXT NOT NULL,
        title TEXT NOT NULL,
        organization TEXT,
        one_line_summary TEXT,
        career_level TEXT,
        employment_type TEXT,
        position_category TEXT,
        remote_policy TEXT,
        tech_categories TEXT NOT NULL DEFAULT '[]',
        locations TEXT NOT NULL DEFAULT '[]',
        started_at TIMESTAMP,
        ended_at TIMESTAMP,
        is_open_ended INTEGER NOT NULL DEFAULT 0,
        is_closed INTEGER NOT NULL DEFAULT 0,
        experience TEXT,
        description TEXT,
        interview_process TEXT,
        compensation TEXT,
        popularity TEXT,
        deleted INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(company);
    CREATE INDEX IF NOT EXISTS idx_jobs_deleted ON jobs(deleted);
"#;

/// Migration 2: Outbox events
const MIGRATION_V2: &str = r#"
    CREATE TABLE IF NOT EXISTS outbox_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        target_type TEXT NOT NULL CHECK (target_type IN ('JOB', 'COMMUNITY_POST', 'TECH_BLOG', 'COMMENT')),
        target_id INTEGER NOT NULL,
        update_type TEXT NOT NULL CHECK (update_type IN ('CREATED', 'UPDATED', 'POPULARITY_ONLY', 'DELETED')),
        status TEXT NOT NULL DEFAULT 'WAIT' CHECK (status IN ('WAIT', 'PROCESSING', 'COMPLETED', 'FAILED')),
        retry_count INTEGER NOT NULL DEFAULT 0,
        error_message TEXT,
        updated_at TIMESTAMP NOT NULL,
        processed_at TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_outbox_events_pending ON outbox_events(status, target_type, id);
    CREATE INDEX IF NOT EXISTS idx_outbox_events_target ON outbox_events(target_type, target_id);
"#;

/// Get the current schema version from the database
async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|(v,)| v).unwrap_or(0))
}

/// Record that a migration has been applied
async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!("Applying migration v1: Jobs table");
        sqlx::raw_sql(MIGRATION_V1).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    if current_version < 2 {
        tracing::info!("Applying migration v2: Outbox events");
        sqlx::raw_sql(MIGRATION_V2).execute(pool).await?;
        record_migration(pool, 2).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Check if the database needs migrations
pub async fn needs_migration(pool: &SqlitePool) -> anyhow::Result<bool> {
    let current_version = get_current_version(pool).await?;
    Ok(current_version < CURRENT_VERSION)
}

/// Get migration status information
pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}
