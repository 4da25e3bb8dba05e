//! Sync worker - outbox → index propagation
//!
//! - `fetcher`: primary-store read seam
//! - `task`: one run over a batch of pending events
//! - `scheduler`: fixed-interval ticking with one active run at a time

pub mod fetcher;
pub mod scheduler;
pub mod task;

pub use fetcher::TargetFetcher;
pub use scheduler::{DEFAULT_INTERVAL, RunGuard, RunPermit, SyncScheduler};
pub use task::{DEFAULT_BATCH_SIZE, SyncFailure, SyncReport, SyncRunner, SyncTask};

use std::sync::Arc;

use crate::config::Config;
use crate::index::{DocIndexer, IndexBackend, JobDocMapper};
use crate::job::JobRepository;
use crate::outbox::{OutboxStore, SqliteOutboxStore, TargetType};
use sqlx::SqlitePool;

/// Wire the job sync task from configuration
pub fn job_sync_task(
    config: &Config,
    pool: SqlitePool,
    backend: Arc<dyn IndexBackend>,
) -> SyncTask<JobRepository, JobDocMapper> {
    let outbox: Arc<dyn OutboxStore> = Arc::new(SqliteOutboxStore::new(pool.clone()));
    SyncTask::new(
        TargetType::Job,
        JobRepository::new(pool),
        JobDocMapper,
        DocIndexer::new(backend, config.search.job_index.clone()),
        outbox,
    )
    .with_batch_size(config.sync.batch_size)
}
