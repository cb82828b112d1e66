//! The [`AssignmentCoordinator`](crate::engine::Engine::claim) transition
//! (spec §4.3): atomically moves a [`WorkUnit`] from the queue to an
//! assigned worker, picking its shard index and recording the initial
//! heartbeat.

use std::time::Instant;

use chrono::Utc;

use crate::ids::WorkerId;
use crate::job::WorkUnit;
use crate::progress::{ProgressFeed, ProgressStatus, ProgressUpdate};
use crate::queue::TaskQueue;
use crate::store::JobStore;

/// A claimed unit of work, including everything the worker needs to start
/// executing (spec §6 "Claim task").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedWork {
    pub task_id: crate::ids::TaskId,
    pub customer_id: crate::ids::CustomerId,
    pub code: Vec<u8>,
    pub dataset_shard: Vec<u8>,
    pub requirement: Option<Vec<u8>>,
    pub worker_index: usize,
    pub total_workers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Nothing queued, or the queued unit turned out to be stale (spec §4.3
    /// steps 2 and 4); the caller may retry.
    NoWork,
    /// The unit belonged to a job that is now cancelled.
    Cancelled,
}

pub fn claim(
    jobs: &mut JobStore,
    queue: &mut TaskQueue,
    feed: &mut ProgressFeed,
    worker_id: WorkerId,
) -> Result<ClaimedWork, ClaimOutcome> {
    let WorkUnit {
        customer_id,
        task_id,
    } = queue.claim().ok_or(ClaimOutcome::NoWork)?;

    let Some(job) = jobs.get_mut(customer_id) else {
        // The job vanished (deleted) between enqueue and claim (spec §4.3
        // step 2, scenario S6). Drop the stale unit; the caller may retry
        // for the next one.
        return Err(ClaimOutcome::NoWork);
    };

    if job.is_cancelled {
        return Err(ClaimOutcome::Cancelled);
    }

    let shard_index = job.assigned_workers.len();
    if shard_index >= job.num_workers {
        // A race with a rescue after the job already reached full
        // replication; this unit is a stale duplicate (spec §4.3 step 4).
        return Err(ClaimOutcome::NoWork);
    }

    job.assigned_workers.push(worker_id.clone());
    job.heartbeats.insert(worker_id.clone(), Instant::now());

    let claimed = ClaimedWork {
        task_id,
        customer_id,
        code: job.code.clone(),
        dataset_shard: job.dataset_shards[shard_index].clone(),
        requirement: job.requirement.clone(),
        worker_index: shard_index,
        total_workers: job.num_workers,
    };

    let progress = job.progress();
    feed.push(ProgressUpdate {
        customer_id,
        text: format!(
            "worker {worker_id} assigned, {}/{} submitted",
            progress.submitted, progress.total
        ),
        timestamp: Utc::now(),
        status: ProgressStatus::Progress,
        is_completion: false,
        progress: Some(progress),
    });

    tracing::info!(%customer_id, %worker_id, shard_index, "worker claimed work unit");

    Ok(claimed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::WorkUnit;

    fn seeded() -> (JobStore, TaskQueue, ProgressFeed, crate::ids::CustomerId) {
        let mut jobs = JobStore::new();
        let mut queue = TaskQueue::new();
        let feed = ProgressFeed::new();
        let (customer_id, task_id, units) =
            jobs.create_job("acme".into(), b"code".to_vec(), None, None, 2);
        for unit in units {
            queue.enqueue(unit);
        }
        let _ = task_id;
        (jobs, queue, feed, customer_id)
    }

    #[test]
    fn claim_assigns_sequential_shard_indices() {
        let (mut jobs, mut queue, mut feed, customer_id) = seeded();

        let first = claim(&mut jobs, &mut queue, &mut feed, "w1".into()).unwrap();
        let second = claim(&mut jobs, &mut queue, &mut feed, "w2".into()).unwrap();

        assert_eq!(first.worker_index, 0);
        assert_eq!(second.worker_index, 1);
        assert_eq!(jobs.get(customer_id).unwrap().assigned_workers.len(), 2);
    }

    #[test]
    fn claim_on_empty_queue_returns_no_work() {
        let mut jobs = JobStore::new();
        let mut queue = TaskQueue::new();
        let mut feed = ProgressFeed::new();
        assert_eq!(
            claim(&mut jobs, &mut queue, &mut feed, "w1".into()),
            Err(ClaimOutcome::NoWork)
        );
    }

    #[test]
    fn claim_against_deleted_job_drops_unit_and_returns_no_work() {
        let mut jobs = JobStore::new();
        let mut queue = TaskQueue::new();
        let mut feed = ProgressFeed::new();
        let customer_id = crate::ids::CustomerId::new();
        queue.enqueue(WorkUnit {
            customer_id,
            task_id: crate::ids::TaskId::new(),
        });

        let result = claim(&mut jobs, &mut queue, &mut feed, "w1".into());
        assert_eq!(result, Err(ClaimOutcome::NoWork));
        assert!(queue.is_empty());
    }

    #[test]
    fn claim_against_cancelled_job_is_rejected_without_requeue() {
        let (mut jobs, mut queue, mut feed, customer_id) = seeded();
        jobs.get_mut(customer_id).unwrap().is_cancelled = true;

        let result = claim(&mut jobs, &mut queue, &mut feed, "w1".into());
        assert_eq!(result, Err(ClaimOutcome::Cancelled));
        assert_eq!(queue.len(), 1, "second unit for this job is untouched");
    }

    #[test]
    fn claim_past_full_replication_is_stale() {
        let (mut jobs, mut queue, mut feed, customer_id) = seeded();
        jobs.get_mut(customer_id)
            .unwrap()
            .assigned_workers
            .extend(["w1".into(), "w2".into()]);
        // Simulate a rescued duplicate unit sitting behind the two live ones.
        queue.enqueue(WorkUnit {
            customer_id,
            task_id: crate::ids::TaskId::new(),
        });

        // The first two units in queue already belong to the two assigned
        // workers' replication slots and should be rejected as stale.
        let r1 = claim(&mut jobs, &mut queue, &mut feed, "w3".into());
        assert_eq!(r1, Err(ClaimOutcome::NoWork));
    }
}
