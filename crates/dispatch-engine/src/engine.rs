//! `Engine` is the single value that owns every piece of process-wide
//! mutable state (spec §9 "Process-wide mutable state" redesign
//! instruction: no module-level singletons). It is constructed once by
//! `dispatch-server::main`, shared behind an `Arc`, and passed explicitly
//! to every HTTP handler and to the periodic fault-detector task.
//!
//! Spec §5 names one engine-wide mutual-exclusion lock guarding the
//! `TaskQueue`, the `JobStore`, and every `Job`'s mutable fields; `State`
//! below is exactly that lock's payload. No operation here ever awaits
//! while holding the lock — the only suspension points are acquiring the
//! lock itself, the fault detector's sleep between sweeps, and the
//! best-effort audit writes, which run after the lock is released.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::assignment::{self, ClaimOutcome, ClaimedWork};
use crate::aggregator::{self, Submission, SubmitOutcome};
use crate::audit::{AuditSink, CounterDelta, NullAuditSink, SubmissionEvent};
use crate::cancel;
use crate::error::EngineError;
use crate::fault_detector;
use crate::ids::{CustomerId, TaskId, WorkerId};
use crate::job::Progress;
use crate::progress::{ProgressFeed, ProgressUpdate};
use crate::queue::TaskQueue;
use crate::store::JobStore;
use crate::usage;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub heartbeat_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// Spec §5: "`SWEEP_INTERVAL <= HEARTBEAT_TIMEOUT / 2` so detection
    /// latency is bounded by the sweep period." Violating this is a
    /// startup-time configuration error, not a runtime check.
    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval > self.heartbeat_timeout / 2 {
            return Err(format!(
                "sweep_interval ({:?}) must be <= heartbeat_timeout / 2 ({:?})",
                self.sweep_interval,
                self.heartbeat_timeout / 2
            ));
        }
        Ok(())
    }
}

struct State {
    jobs: JobStore,
    queue: TaskQueue,
    feed: ProgressFeed,
}

pub struct Engine {
    state: Mutex<State>,
    audit: Arc<dyn AuditSink>,
    config: EngineConfig,
}

/// Output of a successful job submission (spec §6 "Submit job").
#[derive(Debug, Clone, Copy)]
pub struct SubmittedJob {
    pub customer_id: CustomerId,
    pub task_id: TaskId,
    pub num_workers: usize,
}

/// Output of the `poll status` endpoint (spec §6).
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StatusView {
    pub submitted: usize,
    pub total: usize,
    pub percentage: u32,
    pub is_completed: bool,
    pub is_cancelled: bool,
    pub can_download: bool,
}

/// Output of the `poll updates` endpoint (spec §6).
#[derive(Debug, Clone)]
pub struct UpdatesView {
    pub updates: Vec<ProgressUpdate>,
    pub progress: Progress,
    pub is_completed: bool,
}

/// Everything the HTTP layer needs to stream a result archive (spec §6
/// "Download results"). A clone so the archive can be built after the
/// engine lock is released.
#[derive(Debug, Clone)]
pub struct DownloadSnapshot {
    pub customer_id: CustomerId,
    pub task_id: TaskId,
    pub customer_name: String,
    pub num_workers: usize,
    pub results: HashMap<WorkerId, Vec<u8>>,
    pub usage: HashMap<WorkerId, Vec<u8>>,
    pub output_files: HashMap<WorkerId, HashMap<String, Vec<u8>>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_audit(config, Arc::new(NullAuditSink))
    }

    pub fn with_audit(config: EngineConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            state: Mutex::new(State {
                jobs: JobStore::new(),
                queue: TaskQueue::new(),
                feed: ProgressFeed::new(),
            }),
            audit,
            config,
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("engine lock poisoned")
    }

    /// Spec §4.2 `createJob` plus §6 "Submit job": validates `num_workers`,
    /// allocates the job, splits the dataset, and emits its work units.
    pub fn submit_job(
        &self,
        customer_name: String,
        code: Vec<u8>,
        requirement: Option<Vec<u8>>,
        dataset: Option<Vec<u8>>,
        num_workers: usize,
    ) -> Result<SubmittedJob, EngineError> {
        if num_workers == 0 {
            return Err(EngineError::Validation(
                "respn must be a positive integer".to_string(),
            ));
        }
        if code.is_empty() {
            return Err(EngineError::Validation("code is required".to_string()));
        }

        let mut state = self.lock();
        let (customer_id, task_id, units) =
            state
                .jobs
                .create_job(customer_name, code, requirement, dataset, num_workers);
        for unit in units {
            state.queue.enqueue(unit);
        }
        let progress = state.jobs.get(customer_id).unwrap().progress();
        state.feed.push(ProgressUpdate {
            customer_id,
            text: format!("job queued, {num_workers} work units published"),
            timestamp: chrono::Utc::now(),
            status: crate::progress::ProgressStatus::Progress,
            is_completion: false,
            progress: Some(progress),
        });

        tracing::info!(%customer_id, %task_id, num_workers, "job submitted");

        Ok(SubmittedJob {
            customer_id,
            task_id,
            num_workers,
        })
    }

    /// Spec §4.3 `claim(workerId)`.
    pub fn claim(&self, worker_id: WorkerId) -> Result<ClaimedWork, ClaimOutcome> {
        let result = {
            let mut state = self.lock();
            let State { jobs, queue, feed } = &mut *state;
            assignment::claim(jobs, queue, feed, worker_id.clone())
        };

        if result.is_ok() {
            self.spawn_audit_counter(worker_id, CounterDelta::ClaimAssigned);
        }
        result
    }

    /// Spec §4.4 `submit(workerId, customerId, ...)`.
    pub fn submit_result(
        &self,
        worker_id: WorkerId,
        customer_id: CustomerId,
        result: Vec<u8>,
        usage_blob: Vec<u8>,
        output_files: HashMap<String, Vec<u8>>,
    ) -> Result<SubmitOutcome, EngineError> {
        let outcome = {
            let mut state = self.lock();
            let State { jobs, feed, .. } = &mut *state;
            aggregator::submit(
                jobs,
                feed,
                Submission {
                    worker_id: worker_id.clone(),
                    customer_id,
                    result,
                    usage: usage_blob.clone(),
                    output_files,
                },
            )?
        };

        let task_id = self
            .lock()
            .jobs
            .get(customer_id)
            .map(|j| j.task_id)
            .unwrap_or_else(TaskId::new);
        let usage_record = usage::parse_usage(&usage_blob);
        self.spawn_audit_submission(SubmissionEvent {
            customer_id,
            task_id,
            worker_id: worker_id.clone(),
            usage: usage_record,
        });
        self.spawn_audit_counter(worker_id, CounterDelta::SubmissionAccepted);

        Ok(outcome)
    }

    /// Spec §6 "Heartbeat".
    pub fn heartbeat(&self, worker_id: &WorkerId, customer_id: CustomerId) -> bool {
        let mut state = self.lock();
        let Some(job) = state.jobs.get_mut(customer_id) else {
            return false;
        };
        if job.is_cancelled {
            return false;
        }
        if !job.heartbeats.contains_key(worker_id) {
            return false;
        }
        job.heartbeats
            .insert(worker_id.clone(), std::time::Instant::now());
        true
    }

    /// Spec §6 "Cancellation poll".
    pub fn is_cancelled(&self, customer_id: CustomerId) -> Result<bool, EngineError> {
        let state = self.lock();
        state
            .jobs
            .get(customer_id)
            .map(|j| j.is_cancelled)
            .ok_or(EngineError::UnknownJob(customer_id))
    }

    /// Spec §4.7 `cancel(customerId)`.
    pub fn cancel(&self, customer_id: CustomerId) -> Result<(), EngineError> {
        let mut state = self.lock();
        let State { jobs, queue, feed } = &mut *state;
        cancel::cancel(jobs, queue, feed, customer_id)
    }

    /// Spec §6 "Poll status".
    pub fn status(&self, customer_id: CustomerId) -> Result<StatusView, EngineError> {
        let state = self.lock();
        let job = state
            .jobs
            .get(customer_id)
            .ok_or(EngineError::UnknownJob(customer_id))?;
        let progress = job.progress();
        Ok(StatusView {
            submitted: progress.submitted,
            total: progress.total,
            percentage: progress.percentage,
            is_completed: job.is_completed,
            is_cancelled: job.is_cancelled,
            can_download: job.can_download(),
        })
    }

    /// Spec §6 "Poll updates"; implements `ProgressFeed::drain` semantics.
    pub fn poll_updates(&self, customer_id: CustomerId) -> Result<UpdatesView, EngineError> {
        let mut state = self.lock();
        let job = state
            .jobs
            .get(customer_id)
            .ok_or(EngineError::UnknownJob(customer_id))?;
        let progress = job.progress();
        let is_completed = job.is_completed;
        let updates = state.feed.drain(customer_id);
        Ok(UpdatesView {
            updates,
            progress,
            is_completed,
        })
    }

    /// Spec §6 "Download results" gate: refused unless the job is
    /// completed and not cancelled.
    pub fn snapshot_for_download(
        &self,
        customer_id: CustomerId,
    ) -> Result<DownloadSnapshot, EngineError> {
        let state = self.lock();
        let job = state
            .jobs
            .get(customer_id)
            .ok_or(EngineError::UnknownJob(customer_id))?;
        if job.is_cancelled {
            return Err(EngineError::Cancelled(customer_id));
        }
        if !job.is_completed {
            return Err(EngineError::NotReady(customer_id));
        }
        Ok(DownloadSnapshot {
            customer_id: job.customer_id,
            task_id: job.task_id,
            customer_name: job.customer_name.clone(),
            num_workers: job.num_workers,
            results: job.results.clone(),
            usage: job.usage.clone(),
            output_files: job.output_files.clone(),
            completed_at: job.completed_at,
        })
    }

    /// Spec §4.2 `delete(customerId)`.
    pub fn delete_job(&self, customer_id: CustomerId) {
        let mut state = self.lock();
        state.jobs.delete(customer_id);
        state.queue.drop_customer(customer_id);
        state.feed.remove(customer_id);
    }

    /// Runs one fault-detector sweep (spec §4.5) and fires best-effort
    /// audit counters for every reclaimed slot.
    pub fn run_fault_sweep(&self) {
        let reclaimed = {
            let mut state = self.lock();
            let State { jobs, queue, feed } = &mut *state;
            fault_detector::sweep(jobs, queue, feed, self.config.heartbeat_timeout)
        };

        for worker in reclaimed {
            self.spawn_audit_counter(worker.worker_id, CounterDelta::WorkerTimedOut);
        }
    }

    /// Spawns the periodic sweep task (spec §2 component 6, §5 "Suspension
    /// points" (b)). `shutdown` is awaited alongside the sweep interval so
    /// the task exits promptly on graceful shutdown, mirroring how
    /// `automations::server::serve` races its poll loop against a shutdown
    /// future rather than detaching it unconditionally.
    pub fn spawn_fault_detector(
        self: Arc<Self>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.sweep_interval);
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    _ = interval.tick() => self.run_fault_sweep(),
                    () = &mut shutdown => break,
                }
            }
            tracing::info!("fault detector sweep task stopped");
        })
    }

    fn spawn_audit_counter(&self, worker_id: WorkerId, delta: CounterDelta) {
        let audit = self.audit.clone();
        tokio::spawn(async move {
            audit.record_counter(&worker_id, delta).await;
        });
    }

    fn spawn_audit_submission(&self, event: SubmissionEvent) {
        let audit = self.audit.clone();
        tokio::spawn(async move {
            audit.record_submission(event).await;
        });
    }
}
