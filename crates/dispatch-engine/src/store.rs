//! The authoritative, in-memory, process-wide job table (spec §4.2).
//!
//! `JobStore` owns every [`Job`]; callers reach its contents only through
//! [`Engine`](crate::engine::Engine), which is the sole holder of the
//! engine-wide mutual-exclusion lock (spec §5). `JobStore` itself does no
//! locking — it is a plain map, transactional only in the sense that its
//! mutators are always called from inside that lock.

use std::collections::HashMap;

use chrono::Utc;

use crate::ids::{CustomerId, TaskId, WorkerId};
use crate::job::{Job, WorkUnit};

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: HashMap<CustomerId, Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new [`Job`], splitting `dataset` into `num_workers`
    /// contiguous near-equal shards (spec §4.2 "Dataset splitting"), and
    /// returns the job's identity plus the `num_workers` [`WorkUnit`]s the
    /// caller must push onto the [`crate::queue::TaskQueue`].
    ///
    /// `num_workers` must be `>= 1`; callers are expected to validate this
    /// at the HTTP boundary (spec §7 `ValidationError`) before calling in.
    pub fn create_job(
        &mut self,
        customer_name: String,
        code: Vec<u8>,
        requirement: Option<Vec<u8>>,
        dataset: Option<Vec<u8>>,
        num_workers: usize,
    ) -> (CustomerId, TaskId, Vec<WorkUnit>) {
        debug_assert!(num_workers >= 1);

        let customer_id = CustomerId::new();
        let task_id = TaskId::new();
        let dataset_shards = split_dataset(dataset.as_deref().unwrap_or(&[]), num_workers);

        let job = Job {
            customer_id,
            task_id,
            customer_name,
            code,
            requirement,
            dataset_shards,
            num_workers,
            assigned_workers: Vec::new(),
            heartbeats: HashMap::new(),
            results: HashMap::new(),
            usage: HashMap::new(),
            output_files: HashMap::new(),
            pending_workers: num_workers,
            is_completed: false,
            is_cancelled: false,
            completion_notified: false,
            created_at: Utc::now(),
            completed_at: None,
        };

        self.jobs.insert(customer_id, job);

        let units = (0..num_workers)
            .map(|_| WorkUnit {
                customer_id,
                task_id,
            })
            .collect();

        (customer_id, task_id, units)
    }

    pub fn get(&self, customer_id: CustomerId) -> Option<&Job> {
        self.jobs.get(&customer_id)
    }

    pub fn get_mut(&mut self, customer_id: CustomerId) -> Option<&mut Job> {
        self.jobs.get_mut(&customer_id)
    }

    /// Removes the job. Its cancellation flag lives on the `Job` itself, so
    /// deleting the job is sufficient to forget it too (spec §9 "Cancellation
    /// set lifetime").
    pub fn delete(&mut self, customer_id: CustomerId) -> Option<Job> {
        self.jobs.remove(&customer_id)
    }

    /// Jobs that are neither completed nor cancelled, i.e. still eligible
    /// for a [`crate::fault_detector`] sweep.
    pub fn active_jobs_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs
            .values_mut()
            .filter(|job| !job.is_completed && !job.is_cancelled)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Splits `data` into `n` contiguous, disjoint, order-preserving shards.
/// `chunk = ceil(len / n)`; every shard but the last has exactly `chunk`
/// bytes, the last absorbs the remainder (and may be empty or shorter).
/// Concatenating the shards in order reproduces `data` exactly (spec §4.2,
/// tested by scenario S5).
pub fn split_dataset(data: &[u8], n: usize) -> Vec<Vec<u8>> {
    assert!(n >= 1, "shard count must be at least 1");

    if data.is_empty() {
        return vec![Vec::new(); n];
    }

    let chunk = data.len().div_ceil(n);
    (0..n)
        .map(|i| {
            let start = (i * chunk).min(data.len());
            let end = ((i + 1) * chunk).min(data.len());
            data[start..end].to_vec()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_reproduces_original_bytes() {
        let data = b"0123456789";
        let shards = split_dataset(data, 3);
        assert_eq!(shards.iter().map(|s| s.len()).collect::<Vec<_>>(), vec![4, 4, 2]);
        let rejoined: Vec<u8> = shards.into_iter().flatten().collect();
        assert_eq!(rejoined, data);
    }

    #[test]
    fn split_empty_dataset_yields_all_empty_shards() {
        let shards = split_dataset(b"", 4);
        assert_eq!(shards, vec![Vec::<u8>::new(); 4]);
    }

    #[test]
    fn split_single_worker_yields_one_shard() {
        let shards = split_dataset(b"hello", 1);
        assert_eq!(shards, vec![b"hello".to_vec()]);
    }

    #[test]
    fn create_job_emits_one_unit_per_worker() {
        let mut store = JobStore::new();
        let (customer_id, task_id, units) =
            store.create_job("acme".into(), b"print(1)".to_vec(), None, None, 3);
        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| u.customer_id == customer_id && u.task_id == task_id));
        assert_eq!(store.get(customer_id).unwrap().dataset_shards.len(), 3);
    }
}
