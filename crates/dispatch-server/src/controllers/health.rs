//! Liveness endpoint (spec §9 "Health check"): ambient infrastructure the
//! spec never mentions but every HTTP service in the pack carries
//! (teacher: `control::controllers::health_check::show`,
//! `oidc-discovery-server`'s readiness pattern).

use std::time::Instant;

use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    current_time: DateTime<Utc>,
    db_ping_seconds: Option<f64>,
}

pub async fn show(State(ctx): State<AppContext>) -> Json<HealthCheck> {
    Json(HealthCheck {
        current_time: Utc::now(),
        db_ping_seconds: ping(ctx.audit_pool()).await,
    })
}

async fn ping(pool: Option<&sqlx::PgPool>) -> Option<f64> {
    let pool = pool?;
    let start = Instant::now();
    sqlx::query("SELECT 1").execute(pool).await.ok()?;
    Some(start.elapsed().as_secs_f64())
}
