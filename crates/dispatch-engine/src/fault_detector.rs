//! The periodic stall sweep (spec §4.5). Walks every job that is neither
//! completed nor cancelled and reclaims any slot whose heartbeat has gone
//! stale, re-enqueuing a fresh [`WorkUnit`] so another worker can pick it
//! up.

use std::time::{Duration, Instant};

use chrono::Utc;

use crate::ids::WorkerId;
use crate::job::WorkUnit;
use crate::progress::{ProgressFeed, ProgressStatus, ProgressUpdate};
use crate::queue::TaskQueue;
use crate::store::JobStore;

/// One reclaimed slot, reported so the caller can fire a best-effort audit
/// event after releasing the engine lock (spec §5).
#[derive(Debug, Clone)]
pub struct TimedOutWorker {
    pub customer_id: crate::ids::CustomerId,
    pub worker_id: WorkerId,
}

/// Runs one sweep. Returns every worker slot reclaimed this tick.
pub fn sweep(
    jobs: &mut JobStore,
    queue: &mut TaskQueue,
    feed: &mut ProgressFeed,
    heartbeat_timeout: Duration,
) -> Vec<TimedOutWorker> {
    let now = Instant::now();
    let mut reclaimed = Vec::new();

    for job in jobs.active_jobs_mut() {
        let stale: Vec<WorkerId> = job
            .heartbeats
            .iter()
            .filter(|(_, &last_beat)| now.duration_since(last_beat) > heartbeat_timeout)
            .map(|(worker_id, _)| worker_id.clone())
            .collect();

        for worker_id in stale {
            job.assigned_workers.retain(|w| w != &worker_id);
            job.heartbeats.remove(&worker_id);
            // Defensive: an invariant says `results` and `heartbeats` are
            // disjoint, but a reorder under concurrency could leave a stray
            // entry here (spec §4.5 step 1).
            job.results.remove(&worker_id);
            job.usage.remove(&worker_id);
            job.output_files.remove(&worker_id);

            // `pending_workers` already reflects the outstanding slot; do
            // not touch it here (spec §4.5 step 2, §9 open question).

            queue.enqueue(WorkUnit {
                customer_id: job.customer_id,
                task_id: job.task_id,
            });

            feed.push(ProgressUpdate {
                customer_id: job.customer_id,
                text: format!("worker {worker_id} timed out; reassigning"),
                timestamp: Utc::now(),
                status: ProgressStatus::Progress,
                is_completion: false,
                progress: Some(job.progress()),
            });

            tracing::warn!(
                customer_id = %job.customer_id,
                %worker_id,
                "worker heartbeat stale, reassigning shard"
            );

            reclaimed.push(TimedOutWorker {
                customer_id: job.customer_id,
                worker_id,
            });
        }
    }

    reclaimed
}
