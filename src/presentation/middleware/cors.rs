//! CORS Middleware Configuration

use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsSettings;

/// Methods used by the query endpoints and the WebSocket upgrade
const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Create CORS layer from settings
///
/// An empty (or entirely unparsable) origin list allows any origin.
pub fn create_cors_layer(settings: &CorsSettings) -> CorsLayer {
    let origins = parse_origins(&settings.allowed_origins);

    let layer = CorsLayer::new()
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer
            .allow_origin(origins)
            .max_age(std::time::Duration::from_secs(3600))
    }
}

fn parse_origins(origins: &[String]) -> Vec<header::HeaderValue> {
    origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty() && *o != "*")
        .filter_map(|o| o.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_skips_wildcards_and_blanks() {
        let origins = parse_origins(&[
            "http://localhost:3000".into(),
            " ".into(),
            "*".into(),
            "https://app.example.com ".into(),
        ]);

        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:3000");
        assert_eq!(origins[1], "https://app.example.com");
    }
}
