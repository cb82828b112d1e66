//! Router assembly (teacher: `control::routes`/`control::startup::run`).

use axum::routing::{get, post};
use axum::Router;

use crate::context::AppContext;
use crate::controllers::{client, health, worker};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health::show))
        .route("/jobs", post(client::submit))
        .route("/jobs/:customer_id/updates", get(client::poll_updates))
        .route("/jobs/:customer_id/status", get(client::status))
        .route("/jobs/:customer_id/cancel", post(client::cancel))
        .route("/jobs/:customer_id/download", get(client::download))
        .route("/workers/claim", post(worker::claim))
        .route("/workers/submit", post(worker::submit_result))
        .route("/workers/heartbeat", post(worker::heartbeat))
        .route("/workers/:customer_id/cancelled", get(worker::cancel_poll))
}
