//! Permissive-by-default CORS, configurable via `cors_allowed_origins`
//! (spec §9 "CORS", teacher: `control::cors::cors_layer`).

use axum::http::Method;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
        .allow_origin(allow_origin(allowed_origins))
}

fn allow_origin(configured: &[String]) -> AllowOrigin {
    if configured.is_empty() || configured.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<_> = configured
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    }
}
