use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::ids::{CustomerId, TaskId, WorkerId};

/// The aggregate state associated with one client submission.
///
/// See spec §3 for the invariants this type's mutators must uphold; they are
/// enforced by the operations in [`crate::store`], [`crate::assignment`],
/// [`crate::aggregator`], and [`crate::fault_detector`] rather than here —
/// `Job` itself is a plain data bag.
#[derive(Debug, Clone)]
pub struct Job {
    pub customer_id: CustomerId,
    pub task_id: TaskId,
    pub customer_name: String,

    pub code: Vec<u8>,
    pub requirement: Option<Vec<u8>>,
    pub dataset_shards: Vec<Vec<u8>>,

    pub num_workers: usize,
    pub assigned_workers: Vec<WorkerId>,
    pub heartbeats: HashMap<WorkerId, Instant>,
    pub results: HashMap<WorkerId, Vec<u8>>,
    pub usage: HashMap<WorkerId, Vec<u8>>,
    pub output_files: HashMap<WorkerId, HashMap<String, Vec<u8>>>,

    pub pending_workers: usize,
    pub is_completed: bool,
    pub is_cancelled: bool,
    pub completion_notified: bool,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// `submitted / total / percentage` as exposed by the status and progress
    /// endpoints (spec §6). Truth is derived from `|results|`, not the
    /// advisory `pending_workers` counter (spec §9, open question).
    pub fn progress(&self) -> Progress {
        let submitted = self.results.len();
        let total = self.num_workers;
        let percentage = if total == 0 {
            100
        } else {
            ((submitted as f64 / total as f64) * 100.0).floor() as u32
        };
        Progress {
            submitted,
            total,
            percentage,
        }
    }

    pub fn can_download(&self) -> bool {
        self.is_completed && !self.is_cancelled
    }
}

/// `submitted / total / percentage` tuple (spec §3 `ProgressUpdate.progress`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Progress {
    pub submitted: usize,
    pub total: usize,
    pub percentage: u32,
}

/// A single assignable replica of a job, consumed by one worker claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub customer_id: CustomerId,
    pub task_id: TaskId,
}
