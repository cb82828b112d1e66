//! Client-facing operations (spec §6): submit job, poll updates, poll
//! status, cancel job, download results.

use std::str::FromStr;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};

use dispatch_engine::ids::CustomerId;

use crate::auth::BearerToken;
use crate::context::AppContext;
use crate::error::AppError;
use crate::services::{archive, multipart as mp};

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub customer_id: String,
    pub task_id: String,
    pub num_workers: usize,
}

/// `POST /jobs` — multipart upload of `code` (required), `dataset`
/// (optional), `requirement` (optional), plus `customername` and `respn`
/// (spec §6 "Submit job").
pub async fn submit(
    State(ctx): State<AppContext>,
    _token: BearerToken,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut fields = mp::drain(multipart).await?;

    let code = fields
        .remove("code")
        .ok_or(AppError::MissingField { field: "code" })?;
    let dataset = fields.remove("dataset");
    let requirement = fields.remove("requirement");

    let customer_name = fields
        .remove("customername")
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .ok_or(AppError::MissingField {
            field: "customername",
        })?;

    let respn: usize = String::from_utf8_lossy(
        &fields
            .remove("respn")
            .ok_or(AppError::MissingField { field: "respn" })?,
    )
    .trim()
    .parse()
    .map_err(|_| {
        AppError::Engine(dispatch_engine::EngineError::Validation(
            "respn must be a positive integer".to_string(),
        ))
    })?;

    let submitted = ctx
        .engine()
        .submit_job(customer_name, code, requirement, dataset, respn)?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            customer_id: submitted.customer_id.to_string(),
            task_id: submitted.task_id.to_string(),
            num_workers: submitted.num_workers,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CustomerIdParam {
    pub customer_id: String,
}

fn parse_customer_id(raw: &str) -> Result<CustomerId, AppError> {
    CustomerId::from_str(raw).map_err(|_| {
        AppError::Engine(dispatch_engine::EngineError::Validation(
            "customerId is not a valid identifier".to_string(),
        ))
    })
}

#[derive(Debug, Serialize)]
pub struct UpdatesResponse {
    pub updates: Vec<dispatch_engine::progress::ProgressUpdate>,
    pub progress: dispatch_engine::job::Progress,
    pub is_completed: bool,
}

/// `GET /jobs/:customer_id/updates` — implements the `ProgressFeed::drain`
/// semantics (spec §6 "Poll updates").
pub async fn poll_updates(
    State(ctx): State<AppContext>,
    _token: BearerToken,
    Path(CustomerIdParam { customer_id }): Path<CustomerIdParam>,
) -> Result<impl IntoResponse, AppError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let view = ctx.engine().poll_updates(customer_id)?;

    Ok(Json(UpdatesResponse {
        updates: view.updates,
        progress: view.progress,
        is_completed: view.is_completed,
    }))
}

/// `GET /jobs/:customer_id/status` (spec §6 "Poll status").
pub async fn status(
    State(ctx): State<AppContext>,
    _token: BearerToken,
    Path(CustomerIdParam { customer_id }): Path<CustomerIdParam>,
) -> Result<impl IntoResponse, AppError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let view = ctx.engine().status(customer_id)?;
    Ok(Json(view))
}

/// `POST /jobs/:customer_id/cancel` (spec §6 "Cancel job", §4.7).
pub async fn cancel(
    State(ctx): State<AppContext>,
    _token: BearerToken,
    Path(CustomerIdParam { customer_id }): Path<CustomerIdParam>,
) -> Result<impl IntoResponse, AppError> {
    let customer_id = parse_customer_id(&customer_id)?;
    ctx.engine().cancel(customer_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /jobs/:customer_id/download` — streams the result ZIP (spec §6
/// "Download results"). Refused (via [`AppError`]) if cancelled or
/// incomplete.
pub async fn download(
    State(ctx): State<AppContext>,
    _token: BearerToken,
    Path(CustomerIdParam { customer_id }): Path<CustomerIdParam>,
) -> Result<impl IntoResponse, AppError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let snapshot = ctx.engine().snapshot_for_download(customer_id)?;
    let archive_bytes = archive::build(&snapshot)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}_results.zip\"",
                    snapshot.task_id
                ),
            ),
        ],
        archive_bytes,
    ))
}
