//! Primary-store read seam used by the sync worker

use async_trait::async_trait;

use crate::error::Result;

/// Loads the current state of a target from the primary store
///
/// `Ok(None)` means the target does not exist; the worker treats that as a
/// terminal failure for the event.
#[async_trait]
pub trait TargetFetcher: Send + Sync {
    type Aggregate: Send;

    async fn fetch_by_id(&self, target_id: i64) -> Result<Option<Self::Aggregate>>;
}
