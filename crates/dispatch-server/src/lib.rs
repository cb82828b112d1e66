//! The HTTP shell and external-collaborator adapters for the
//! distributed task-dispatch server: the axum router, multipart
//! decoding, ZIP archive construction, the best-effort `sqlx`-backed
//! audit sink, configuration loading, CORS, and graceful shutdown.
//!
//! The job-lifecycle engine itself lives one layer down, in
//! `dispatch_engine`; this crate never mutates engine state directly —
//! every handler goes through `dispatch_engine::Engine`'s public API.

pub mod auth;
pub mod config;
pub mod context;
pub mod cors;
pub mod error;
pub mod repo;
pub mod routes;
pub mod services;
pub mod startup;

mod controllers;
