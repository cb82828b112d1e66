//! Layered configuration (spec §6 "Configuration"): a base file plus an
//! optional environment-specific file, followed by `DISPATCH_`-prefixed
//! environment variable overrides and `clap` CLI flags — mirrors
//! `control::config::load_settings` plus `oidc-discovery-server::Args`'s
//! `env = "..."` pattern for container-friendly overrides.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub engine: EngineSettings,
    #[serde(default)]
    pub audit: AuditSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    pub heartbeat_timeout_ms: u64,
    pub sweep_interval_ms: u64,
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> dispatch_engine::EngineConfig {
        dispatch_engine::EngineConfig {
            heartbeat_timeout: Duration::from_millis(self.heartbeat_timeout_ms),
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditSettings {
    /// Postgres DSN for the best-effort audit sink (spec §6 "persisted
    /// audit state"). When absent, `dispatch-server` falls back to
    /// `dispatch_engine::audit::NullAuditSink`.
    pub database_url: Option<String>,
    /// Bearer-token signing secret. Read but not otherwise implemented —
    /// auth is "only its contract sketched" (spec §1).
    pub token_secret: Option<String>,
}

/// CLI overrides, composed on top of file/env configuration (teacher:
/// `oidc-discovery-server::Args`).
#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the directory holding `base.{toml,yaml,json}` and an
    /// optional `<DISPATCH_ENV>.{toml,yaml,json}` override file.
    #[clap(long = "config-dir", env = "DISPATCH_CONFIG_DIR")]
    pub config_dir: Option<String>,

    #[clap(long = "host", env = "DISPATCH_HOST")]
    pub host: Option<String>,

    #[clap(long = "port", env = "DISPATCH_PORT")]
    pub port: Option<u16>,

    #[clap(long = "audit-database", env = "DISPATCH_AUDIT_DATABASE_URL")]
    pub audit_database_url: Option<String>,
}

/// `control::config::app_env` equivalent: which environment-specific
/// override file to layer on top of `base`.
pub fn app_env() -> String {
    std::env::var("DISPATCH_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Loads layered settings: `base` file, then `<app_env>` file (both
/// optional — a deployment may supply everything via environment
/// variables instead), then `DISPATCH_`-prefixed env vars, then explicit
/// CLI flags, which win over everything (teacher:
/// `control::config::load_settings`).
pub fn load_settings(args: &Args) -> anyhow::Result<Settings> {
    let config_dir = args
        .config_dir
        .clone()
        .unwrap_or_else(|| "config".to_string());
    let config_dir = std::path::PathBuf::from(config_dir);

    let mut builder = config::Config::builder().add_source(
        config::Environment::with_prefix("DISPATCH")
            .separator("__")
            .try_parsing(true),
    );

    builder = builder.add_source(
        config::File::from(config_dir.join("base")).required(false),
    );
    builder = builder.add_source(
        config::File::from(config_dir.join(app_env())).required(false),
    );
    // Re-layer the environment after the files so env vars still win over
    // file defaults but lose to nothing except the CLI overrides below.
    builder = builder.add_source(
        config::Environment::with_prefix("DISPATCH")
            .separator("__")
            .try_parsing(true),
    );
    builder = builder.set_default("application.host", "0.0.0.0")?;
    builder = builder.set_default("application.port", 8080)?;
    builder = builder.set_default("engine.heartbeat_timeout_ms", 30_000)?;
    builder = builder.set_default("engine.sweep_interval_ms", 5_000)?;

    let mut settings: Settings = builder.build()?.try_deserialize()?;

    if let Some(host) = &args.host {
        settings.application.host = host.clone();
    }
    if let Some(port) = args.port {
        settings.application.port = port;
    }
    if let Some(url) = &args.audit_database_url {
        settings.audit.database_url = Some(url.clone());
    }

    settings
        .engine
        .to_engine_config()
        .validate()
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_without_any_source() {
        let args = Args {
            config_dir: Some("/nonexistent".to_string()),
            host: None,
            port: None,
            audit_database_url: None,
        };
        let settings = load_settings(&args).expect("defaults alone must be sufficient");
        assert_eq!(settings.application.port, 8080);
        assert_eq!(settings.engine.heartbeat_timeout_ms, 30_000);
    }

    #[test]
    fn cli_overrides_win() {
        let args = Args {
            config_dir: Some("/nonexistent".to_string()),
            host: Some("127.0.0.1".to_string()),
            port: Some(9999),
            audit_database_url: None,
        };
        let settings = load_settings(&args).unwrap();
        assert_eq!(settings.application.host, "127.0.0.1");
        assert_eq!(settings.application.port, 9999);
    }
}
