//! Process wiring: builds the axum app, binds the listener, and serves it
//! with graceful shutdown (teacher: `control::startup::run`,
//! `oidc-discovery-server::run`'s `axum::serve(...).with_graceful_shutdown`
//! pattern).

use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use dispatch_engine::Engine;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Settings;
use crate::context::AppContext;
use crate::cors::cors_layer;
use crate::routes::routes;

pub async fn connect_audit_pool(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(Into::into)
}

pub async fn run(settings: Settings, engine: Arc<Engine>, audit_pool: Option<PgPool>) -> anyhow::Result<()> {
    let address = settings.application.address();
    let cors = cors_layer(&settings.application.cors_allowed_origins);
    let ctx = AppContext::new(engine.clone(), settings, audit_pool);

    let app = routes().with_state(ctx).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "dispatch-server listening");

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let sweep_shutdown = {
        let mut rx = shutdown_tx.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    };
    let sweep_handle = engine.clone().spawn_fault_detector(sweep_shutdown);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    sweep_handle.await.ok();
    Ok(())
}

async fn shutdown_signal(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("shutdown signal received, draining fault detector");
    let _ = shutdown_tx.send(());
}
