//! The real, `sqlx`-backed [`AuditSink`] (spec §6 "Persisted audit
//! state"): one row per submission in `worker_usage_stats`, per-worker
//! counters in `resource_provider`. Deliberately uses runtime `sqlx::query`
//! rather than the `query!`/`query_as!` macros the teacher favors
//! elsewhere (`control::repo::connectors`) — those require a live database
//! or a committed `.sqlx` offline cache at compile time, which this
//! workspace does not carry.
//!
//! Every method here is best-effort: a failed write is logged via
//! `tracing::warn!` and otherwise discarded. The engine never observes it
//! (spec §7 `AuditFailure` is never surfaced, never rolls back state).

use async_trait::async_trait;
use sqlx::PgPool;

use dispatch_engine::audit::{AuditSink, CounterDelta, SubmissionEvent};
use dispatch_engine::ids::WorkerId;

pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn record_counter(&self, worker_id: &WorkerId, delta: CounterDelta) {
        let (pending, running, completed, failed) = match delta {
            CounterDelta::ClaimAssigned => (1_i32, 1_i32, 0_i32, 0_i32),
            CounterDelta::SubmissionAccepted => (-1, -1, 1, 0),
            CounterDelta::WorkerTimedOut => (-1, -1, 0, 1),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO resource_provider (worker_id, task_pending, task_running, task_completed, task_failed)
            VALUES ($1, GREATEST($2, 0), GREATEST($3, 0), $4, $5)
            ON CONFLICT (worker_id) DO UPDATE SET
                task_pending = GREATEST(resource_provider.task_pending + $2, 0),
                task_running = GREATEST(resource_provider.task_running + $3, 0),
                task_completed = resource_provider.task_completed + $4,
                task_failed = resource_provider.task_failed + $5
            "#,
        )
        .bind(worker_id.0.as_str())
        .bind(pending)
        .bind(running)
        .bind(completed)
        .bind(failed)
        .execute(&self.pool)
        .await;

        if let Err(error) = result {
            tracing::warn!(%worker_id, ?delta, %error, "audit counter write failed");
        }
    }

    async fn record_submission(&self, event: SubmissionEvent) {
        let SubmissionEvent {
            customer_id,
            task_id,
            worker_id,
            usage,
        } = event;

        let result = sqlx::query(
            r#"
            INSERT INTO worker_usage_stats
                (customer_id, task_id, worker_id, cpu_percent, memory_mb, execution_time_secs, raw_usage)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(customer_id.to_string())
        .bind(task_id.to_string())
        .bind(worker_id.0.as_str())
        .bind(usage.cpu_percent)
        .bind(usage.memory_mb)
        .bind(usage.execution_time_secs as i64)
        .bind(usage.raw)
        .execute(&self.pool)
        .await;

        if let Err(error) = result {
            tracing::warn!(%customer_id, %worker_id, %error, "audit submission write failed");
        }
    }
}
