//! Engine-layer error taxonomy (spec §7, minus `AuthError` and `AuditFailure`
//! which are owned by the HTTP shell).

use thiserror::Error;

use crate::ids::{CustomerId, WorkerId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("no job known for customer {0}")]
    UnknownJob(CustomerId),

    #[error("worker {worker} is not assigned to job {customer}")]
    Unauthorized {
        worker: WorkerId,
        customer: CustomerId,
    },

    #[error("job {0} is cancelled")]
    Cancelled(CustomerId),

    #[error("worker {worker} already submitted a result for job {customer}")]
    Duplicate {
        worker: WorkerId,
        customer: CustomerId,
    },

    #[error("job {0} has not produced results from every worker yet")]
    NotReady(CustomerId),

    #[error("{0}")]
    Validation(String),
}
