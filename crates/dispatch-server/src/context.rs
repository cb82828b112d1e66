//! The value every handler and the sweep task share (teacher:
//! `control::context::AppContext`). Spec §9's "process-wide mutable
//! state" redesign instruction means there is no module-level singleton
//! here — `main` constructs one `AppContext` and hands it to the router
//! and the fault-detector task.

use std::sync::Arc;

use dispatch_engine::Engine;
use sqlx::PgPool;

use crate::config::Settings;

#[derive(Clone)]
pub struct AppContext {
    engine: Arc<Engine>,
    settings: Arc<Settings>,
    audit_pool: Option<PgPool>,
}

impl AppContext {
    pub fn new(engine: Arc<Engine>, settings: Settings, audit_pool: Option<PgPool>) -> Self {
        Self {
            engine,
            settings: Arc::new(settings),
            audit_pool,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn audit_pool(&self) -> Option<&PgPool> {
        self.audit_pool.as_ref()
    }
}
