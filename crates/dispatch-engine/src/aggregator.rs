//! The [`ResultAggregator`] transition (spec §4.4): accepts a worker's
//! submission, checks eligibility in order, stores artifacts, recomputes
//! completion, and fires the progress notification.

use std::collections::HashMap;

use chrono::Utc;

use crate::error::EngineError;
use crate::ids::{CustomerId, WorkerId};
use crate::job::Progress;
use crate::progress::{ProgressFeed, ProgressStatus, ProgressUpdate};
use crate::store::JobStore;

pub struct Submission {
    pub worker_id: WorkerId,
    pub customer_id: CustomerId,
    pub result: Vec<u8>,
    pub usage: Vec<u8>,
    pub output_files: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub progress: Progress,
    pub is_completed: bool,
}

/// Applies preconditions in the order spec §4.4 lists them: first failure
/// returns immediately without partial mutation.
pub fn submit(
    jobs: &mut JobStore,
    feed: &mut ProgressFeed,
    submission: Submission,
) -> Result<SubmitOutcome, EngineError> {
    let Submission {
        worker_id,
        customer_id,
        result,
        usage,
        output_files,
    } = submission;

    let job = jobs
        .get_mut(customer_id)
        .ok_or(EngineError::UnknownJob(customer_id))?;

    if job.is_cancelled {
        return Err(EngineError::Cancelled(customer_id));
    }
    if !job.assigned_workers.contains(&worker_id) {
        return Err(EngineError::Unauthorized {
            worker: worker_id,
            customer: customer_id,
        });
    }
    if job.results.contains_key(&worker_id) {
        return Err(EngineError::Duplicate {
            worker: worker_id,
            customer: customer_id,
        });
    }

    job.results.insert(worker_id.clone(), result);
    job.usage.insert(worker_id.clone(), usage);
    job.output_files.insert(worker_id.clone(), output_files);
    job.heartbeats.remove(&worker_id);
    job.pending_workers = job.pending_workers.saturating_sub(1);

    let progress = job.progress();
    feed.push(ProgressUpdate {
        customer_id,
        text: format!(
            "worker {worker_id} submitted, {}/{} submitted",
            progress.submitted, progress.total
        ),
        timestamp: Utc::now(),
        status: ProgressStatus::Progress,
        is_completion: false,
        progress: Some(progress),
    });

    let is_completed = job.results.len() == job.num_workers
        && job.assigned_workers.len() == job.num_workers;

    if is_completed {
        job.is_completed = true;
        job.completed_at = Some(Utc::now());

        if !job.completion_notified {
            job.completion_notified = true;
            feed.push(ProgressUpdate {
                customer_id,
                text: "job completed".to_string(),
                timestamp: Utc::now(),
                status: ProgressStatus::Completed,
                is_completion: true,
                progress: Some(progress),
            });
        }
    }

    tracing::info!(%customer_id, %worker_id, is_completed, "worker result accepted");

    Ok(SubmitOutcome {
        progress,
        is_completed,
    })
}
