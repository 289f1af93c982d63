//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

use std::net::SocketAddr;

use axum::{body::Body, http::Request, response::Response, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use realtime_hub::config::Settings;
use realtime_hub::presentation::http::routes::create_router;
use realtime_hub::startup::AppState;

/// Test application backed by in-memory stores
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application without PostgreSQL or Redis
    pub async fn new() -> Self {
        Self::with_settings(Settings::default()).await
    }

    /// Test application with custom settings
    pub async fn with_settings(settings: Settings) -> Self {
        let state = AppState::new(settings, None, None);
        let router = create_router(state.clone());
        Self { router, state }
    }

    /// Serve the router on an ephemeral local port
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    /// Signed access token for `subject`
    pub fn token(&self, subject: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = json!({ "sub": subject, "iat": now, "exp": now + 3600 });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.state.settings.jwt.secret.as_bytes()),
        )
        .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Make an authenticated GET request
    pub async fn get_auth(&self, uri: &str, token: &str) -> Response {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: &Value) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Make an authenticated POST request with JSON body
    pub async fn post_json_auth(&self, uri: &str, body: &Value, token: &str) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// Collect a response body as JSON
pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll `condition` until it holds or a few seconds pass
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..300 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}
