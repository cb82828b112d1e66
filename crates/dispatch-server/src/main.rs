//! Process entry point (teacher: `oidc-discovery-server::main` /
//! `control::main`): installs the tracing subscriber, parses CLI/env
//! configuration, wires the engine and (optional) audit sink, and runs
//! the HTTP server until a shutdown signal arrives.

use std::sync::Arc;

use clap::Parser;

use dispatch_engine::Engine;
use dispatch_server::config::{self, Args};
use dispatch_server::repo::audit::PostgresAuditSink;
use dispatch_server::startup;

fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting tracing default failed");

    let args = Args::parse();
    let settings = config::load_settings(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let engine_config = settings.engine.to_engine_config();

        let audit_pool = match &settings.audit.database_url {
            Some(url) => Some(startup::connect_audit_pool(url).await?),
            None => None,
        };

        let engine = match &audit_pool {
            Some(pool) => Arc::new(Engine::with_audit(
                engine_config,
                Arc::new(PostgresAuditSink::new(pool.clone())),
            )),
            None => Arc::new(Engine::new(engine_config)),
        };

        startup::run(settings, engine, audit_pool).await
    })
}
