//! Worker-facing operations (spec §6): claim task, submit result,
//! heartbeat, cancellation poll.

use std::str::FromStr;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use dispatch_engine::assignment::ClaimedWork;
use dispatch_engine::ids::{CustomerId, WorkerId};

use crate::context::AppContext;
use crate::error::AppError;
use crate::services::multipart as mp;

fn parse_customer_id(raw: &str) -> Result<CustomerId, AppError> {
    CustomerId::from_str(raw).map_err(|_| {
        AppError::Engine(dispatch_engine::EngineError::Validation(
            "customerId is not a valid identifier".to_string(),
        ))
    })
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub worker_id: String,
}

/// `POST /workers/claim` (spec §6 "Claim task"). Base64-encodes code,
/// dataset shard, and requirement inline (spec §9 "Base64 in JSON vs
/// streaming" — a deliberate, acknowledged bloat tradeoff the spec allows
/// implementers to revisit, kept here because the claim payload is JSON,
/// unlike the already-multipart submission path).
pub async fn claim(
    State(ctx): State<AppContext>,
    Json(request): Json<ClaimRequest>,
) -> Result<impl IntoResponse, AppError> {
    let worker_id = WorkerId::from(request.worker_id);
    match ctx.engine().claim(worker_id) {
        Ok(work) => Ok((StatusCode::OK, Json(ClaimView::from(work))).into_response()),
        Err(outcome) => match outcome {
            dispatch_engine::assignment::ClaimOutcome::NoWork => {
                Ok((StatusCode::NO_CONTENT, Json(NoWork::no_work())).into_response())
            }
            dispatch_engine::assignment::ClaimOutcome::Cancelled => {
                Ok((StatusCode::OK, Json(NoWork::cancelled())).into_response())
            }
        },
    }
}

#[derive(Debug, Serialize)]
struct NoWork {
    status: &'static str,
}

impl NoWork {
    fn no_work() -> Self {
        Self { status: "no-work" }
    }
    fn cancelled() -> Self {
        Self {
            status: "cancelled",
        }
    }
}

#[derive(Debug, Serialize)]
struct ClaimView {
    status: &'static str,
    task_id: String,
    customer_id: String,
    worker_index: usize,
    total_workers: usize,
    code: String,
    dataset: String,
    requirement: Option<String>,
}

impl From<ClaimedWork> for ClaimView {
    fn from(work: ClaimedWork) -> Self {
        let b64 = base64::engine::general_purpose::STANDARD;
        Self {
            status: "assigned",
            task_id: work.task_id.to_string(),
            customer_id: work.customer_id.to_string(),
            worker_index: work.worker_index,
            total_workers: work.total_workers,
            code: b64.encode(&work.code),
            dataset: b64.encode(&work.dataset_shard),
            requirement: work.requirement.map(|r| b64.encode(r)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResultResponse {
    pub progress: dispatch_engine::job::Progress,
    pub is_completed: bool,
}

/// `POST /workers/submit` — multipart: `worker_id`, `customer_id`,
/// `result`, `usage`, and zero or more `output_<filename>` fields (spec
/// §6 "Submit result").
pub async fn submit_result(
    State(ctx): State<AppContext>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut fields = mp::drain(multipart).await?;
    let output_files = mp::split_output_fields(&mut fields)?;

    let worker_id = fields
        .remove("worker_id")
        .map(|b| WorkerId::from(String::from_utf8_lossy(&b).into_owned()))
        .ok_or(AppError::MissingField { field: "worker_id" })?;
    let customer_id = fields
        .remove("customer_id")
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .ok_or(AppError::MissingField {
            field: "customer_id",
        })?;
    let customer_id = parse_customer_id(&customer_id)?;
    let result = fields
        .remove("result")
        .ok_or(AppError::MissingField { field: "result" })?;
    let usage = fields
        .remove("usage")
        .ok_or(AppError::MissingField { field: "usage" })?;

    let outcome =
        ctx.engine()
            .submit_result(worker_id, customer_id, result, usage, output_files)?;

    Ok(Json(SubmitResultResponse {
        progress: outcome.progress,
        is_completed: outcome.is_completed,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub worker_id: String,
    pub customer_id: String,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub ok: bool,
}

/// `POST /workers/heartbeat` (spec §6 "Heartbeat").
pub async fn heartbeat(
    State(ctx): State<AppContext>,
    Json(request): Json<HeartbeatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let customer_id = parse_customer_id(&request.customer_id)?;
    let worker_id = WorkerId::from(request.worker_id);
    let ok = ctx.engine().heartbeat(&worker_id, customer_id);
    Ok(Json(HeartbeatResponse { ok }))
}

#[derive(Debug, Deserialize)]
pub struct CancelPollParam {
    pub customer_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelPollResponse {
    pub cancel: bool,
}

/// `GET /workers/:customer_id/cancelled` (spec §6 "Cancellation poll").
pub async fn cancel_poll(
    State(ctx): State<AppContext>,
    Path(CancelPollParam { customer_id }): Path<CancelPollParam>,
) -> Result<impl IntoResponse, AppError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let cancel = ctx.engine().is_cancelled(customer_id)?;
    Ok(Json(CancelPollResponse { cancel }))
}
