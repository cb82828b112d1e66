//! Cancellation (spec §4.7). Cooperative: the engine stops granting new
//! work and heartbeat refreshes, but cannot reach into an in-flight
//! worker — workers must poll the cancellation endpoint and stop on their
//! own.

use chrono::Utc;

use crate::error::EngineError;
use crate::ids::CustomerId;
use crate::progress::{ProgressFeed, ProgressStatus, ProgressUpdate};
use crate::queue::TaskQueue;
use crate::store::JobStore;

pub fn cancel(
    jobs: &mut JobStore,
    queue: &mut TaskQueue,
    feed: &mut ProgressFeed,
    customer_id: CustomerId,
) -> Result<(), EngineError> {
    let job = jobs
        .get_mut(customer_id)
        .ok_or(EngineError::UnknownJob(customer_id))?;

    job.pending_workers = 0;
    job.is_cancelled = true;
    job.heartbeats.clear();
    // Already-submitted results are kept; nothing in §4.7 asks for them to
    // be purged, and a client may still want to inspect partial output.

    queue.drop_customer(customer_id);

    feed.push(ProgressUpdate {
        customer_id,
        text: "job cancelled".to_string(),
        timestamp: Utc::now(),
        status: ProgressStatus::Cancelled,
        is_completion: false,
        progress: Some(job.progress()),
    });

    tracing::info!(%customer_id, "job cancelled");

    Ok(())
}
