//! HTTP-layer error taxonomy (spec §7), matching the teacher's
//! `control::error::AppError` pattern: a typed enum implementing
//! `IntoResponse`, mapping every variant to a stable status code.
//!
//! Wraps `dispatch_engine::EngineError` plus transport-layer failures the
//! engine itself never sees (multipart decode, archive I/O, auth). Audit
//! failures never reach this type at all — they are logged at the call
//! site and swallowed, mirroring how `automations::server::serve` swallows
//! per-tick dequeue errors instead of propagating them.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use dispatch_engine::EngineError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    detail: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("missing or invalid bearer token")]
    Auth,

    #[error("malformed multipart request")]
    Multipart(#[from] MultipartError),

    #[error("'{field}' is required")]
    MissingField { field: &'static str },

    #[error("output filename {0:?} is not a valid filename")]
    InvalidFilename(String),

    #[error("archive construction failed")]
    Archive(#[from] std::io::Error),

    #[error("archive construction failed")]
    Zip(#[from] zip::result::ZipError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Engine(EngineError::UnknownJob(_)) => StatusCode::NOT_FOUND,
            AppError::Engine(EngineError::Unauthorized { .. }) => StatusCode::FORBIDDEN,
            AppError::Engine(EngineError::Cancelled(_)) => StatusCode::CONFLICT,
            AppError::Engine(EngineError::Duplicate { .. }) => StatusCode::CONFLICT,
            AppError::Engine(EngineError::NotReady(_)) => StatusCode::CONFLICT,
            AppError::Engine(EngineError::Validation(_)) => StatusCode::BAD_REQUEST,
            AppError::Auth => StatusCode::UNAUTHORIZED,
            AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::MissingField { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidFilename(_) => StatusCode::BAD_REQUEST,
            AppError::Archive(_) | AppError::Zip(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = Json(ErrorBody {
            error: self.to_string(),
            detail: None,
        });

        (status, body).into_response()
    }
}
