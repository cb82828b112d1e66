//! The job-lifecycle engine of the distributed task-dispatch server: the
//! task queue, assignment protocol, heartbeat-driven fault detector,
//! result aggregation, cancellation semantics, and the progress feed.
//!
//! No HTTP, no SQL, and no I/O ever happens while the engine's lock is
//! held (see [`engine::Engine`] for the concurrency discipline). Those
//! concerns — ZIP archive construction, the audit database, the bearer
//! token extractor, request framing — live one layer up, in
//! `dispatch-server`.

pub mod aggregator;
pub mod assignment;
pub mod audit;
pub mod cancel;
pub mod engine;
pub mod error;
pub mod fault_detector;
pub mod ids;
pub mod job;
pub mod progress;
pub mod queue;
pub mod store;
pub mod usage;

pub use engine::{Engine, EngineConfig};
pub use error::EngineError;
pub use ids::{CustomerId, TaskId, WorkerId};
