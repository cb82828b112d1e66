//! The best-effort external audit collaborator (spec §2 component 8, §6
//! "Persisted audit state"). The engine never blocks on this, and a failed
//! write never rolls back engine state (spec §7, `AuditFailure`) — the
//! engine only ever hands the sink a fire-and-forget event after its lock
//! has been released (spec §5 "Suspension points").
//!
//! `dispatch-engine` defines the contract; `dispatch-server` supplies the
//! real `sqlx`-backed implementation. Tests use [`NullAuditSink`].

use crate::ids::{CustomerId, TaskId, WorkerId};
use crate::usage::UsageRecord;

/// One of the three counter deltas the source system keeps per worker
/// (spec §6 `resource_provider` table): `task_pending`, `task_running`,
/// `task_completed`, `task_failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterDelta {
    ClaimAssigned,
    SubmissionAccepted,
    WorkerTimedOut,
}

#[derive(Debug, Clone)]
pub struct SubmissionEvent {
    pub customer_id: CustomerId,
    pub task_id: TaskId,
    pub worker_id: WorkerId,
    pub usage: UsageRecord,
}

#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_counter(&self, worker_id: &WorkerId, delta: CounterDelta);

    async fn record_submission(&self, event: SubmissionEvent);
}

/// Default sink used wherever no real audit store is wired up (engine unit
/// tests, and any deployment that omits `audit_database_url`).
#[derive(Debug, Default)]
pub struct NullAuditSink;

#[async_trait::async_trait]
impl AuditSink for NullAuditSink {
    async fn record_counter(&self, worker_id: &WorkerId, delta: CounterDelta) {
        tracing::debug!(%worker_id, ?delta, "audit sink disabled, dropping counter update");
    }

    async fn record_submission(&self, event: SubmissionEvent) {
        tracing::debug!(
            customer_id = %event.customer_id,
            worker_id = %event.worker_id,
            "audit sink disabled, dropping submission record"
        );
    }
}
