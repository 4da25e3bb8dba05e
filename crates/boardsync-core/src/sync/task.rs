//! Sync task - drains the outbox for one target type into the index
//!
//! Each run claims a batch of WAIT events, re-reads every target's current
//! state, maps it to a document and upserts it. One event failing never stops
//! the rest of the batch, and no claimed event is left in PROCESSING when the
//! run returns: events whose final status could not be written go back to WAIT.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::fetcher::TargetFetcher;
use crate::error::{Error, Result};
use crate::index::{DocIndexer, DocMapper, IndexDocument};
use crate::outbox::{FindPendingEvents, OutboxEvent, OutboxStore, TargetType};

/// Default number of events claimed per run
pub const DEFAULT_BATCH_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub event_id: i64,
    pub target_id: i64,
    pub message: String,
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub target_type: TargetType,
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    /// Events returned to WAIT because their status write failed
    pub released: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn empty(target_type: TargetType) -> Self {
        Self {
            target_type,
            claimed: 0,
            completed: 0,
            failed: 0,
            released: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.claimed == 0
    }
}

/// Something the scheduler can run repeatedly
#[async_trait]
pub trait SyncRunner: Send + Sync {
    fn target_type(&self) -> TargetType;

    async fn run(&self) -> Result<SyncReport>;

    /// Return events stranded in PROCESSING by an interrupted run to WAIT
    async fn release_in_flight(&self) -> Result<u64>;
}

pub struct SyncTask<Fe, M> {
    target_type: TargetType,
    fetcher: Fe,
    mapper: M,
    indexer: DocIndexer,
    outbox: Arc<dyn OutboxStore>,
    batch_size: u32,
}

impl<Fe, M> std::fmt::Debug for SyncTask<Fe, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncTask")
            .field("target_type", &self.target_type)
            .field("index", &self.indexer.index_name())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl<Fe, M> SyncTask<Fe, M>
where
    Fe: TargetFetcher,
    M: DocMapper<Aggregate = Fe::Aggregate>,
{
    pub fn new(
        target_type: TargetType,
        fetcher: Fe,
        mapper: M,
        indexer: DocIndexer,
        outbox: Arc<dyn OutboxStore>,
    ) -> Self {
        Self {
            target_type,
            fetcher,
            mapper,
            indexer,
            outbox,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Re-materialize one target and write its document
    async fn process(&self, event: &OutboxEvent) -> Result<()> {
        let aggregate = self
            .fetcher
            .fetch_by_id(event.target_id)
            .await?
            .ok_or(Error::TargetNotFound {
                target_type: event.target_type,
                target_id: event.target_id,
            })?;

        let doc = self.mapper.to_doc(&aggregate)?;
        self.indexer.index(&doc).await?;

        debug!(
            event_id = event.id,
            doc_id = doc.doc_id(),
            update_type = %event.update_type,
            "Synchronized target"
        );
        Ok(())
    }
}

#[async_trait]
impl<Fe, M> SyncRunner for SyncTask<Fe, M>
where
    Fe: TargetFetcher,
    M: DocMapper<Aggregate = Fe::Aggregate>,
{
    fn target_type(&self) -> TargetType {
        self.target_type
    }

    async fn run(&self) -> Result<SyncReport> {
        let events = self
            .outbox
            .claim_pending(FindPendingEvents::of_type(self.batch_size, self.target_type))
            .await?;

        if events.is_empty() {
            debug!(target_type = %self.target_type, "No pending events to process");
            return Ok(SyncReport::empty(self.target_type));
        }

        info!(target_type = %self.target_type, count = events.len(), "Found pending events");

        let mut report = SyncReport::empty(self.target_type);
        report.claimed = events.len();

        let mut unsettled = Vec::new();

        for event in events {
            let (event_id, target_id) = (event.id, event.target_id);
            let outcome = self.process(&event).await.map_err(|e| e.to_string());
            let updated = match &outcome {
                Ok(()) => event.mark_completed(),
                Err(message) => {
                    error!(event_id, target_id, error = %message, "Failed to process outbox event");
                    event.mark_failed(message.clone())
                }
            };

            let message = match (self.outbox.update(&updated).await, outcome) {
                (Ok(_), Ok(())) => {
                    report.completed += 1;
                    continue;
                }
                (Ok(_), Err(message)) => message,
                (Err(e), _) => {
                    error!(event_id, error = %e, "Failed to record outbox event status");
                    unsettled.push(event_id);
                    format!("status update failed: {}", e)
                }
            };
            report.failed += 1;
            report.failures.push(SyncFailure {
                event_id,
                target_id,
                message,
            });
        }

        if !unsettled.is_empty() {
            match self.outbox.release_claimed(&unsettled).await {
                Ok(released) => {
                    report.released = released as usize;
                    warn!(released, "Returned unsettled outbox events to WAIT");
                }
                // Left in PROCESSING until the next scheduler start
                Err(e) => error!(count = unsettled.len(), error = %e, "Failed to release unsettled outbox events"),
            }
        }

        info!(
            target_type = %self.target_type,
            success = report.completed,
            failed = report.failed,
            "Sync run completed"
        );
        Ok(report)
    }

    async fn release_in_flight(&self) -> Result<u64> {
        self.outbox.release_in_flight(Some(self.target_type)).await
    }
}
