//! CORS layer configuration.

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{Any, CorsLayer};

use reminder_core::config::ServerConfig;

/// Builds a CORS tower layer from the server's allowed origins.
///
/// With a wildcard origin credentials are not allowed; browsers reject
/// that combination.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .max_age(std::time::Duration::from_secs(3600));

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    layer
        .allow_origin(origins)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
