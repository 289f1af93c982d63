//! Authentication Middleware
//!
//! JWT validation for protected routes and WebSocket upgrades.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::{optional_flexible_id, Identity};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    #[serde(
        default,
        deserialize_with = "optional_flexible_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub: Option<Identity>,
    /// Legacy user id claim, string or number
    #[serde(
        default,
        deserialize_with = "optional_flexible_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<Identity>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    /// `sub` when present, otherwise `user_id`.
    pub fn identity(self) -> Option<Identity> {
        self.sub
            .filter(Identity::is_addressable)
            .or(self.user_id)
            .filter(Identity::is_addressable)
    }
}

/// Authenticated user extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
}

/// Validate `token` and resolve the identity it carries.
pub fn decode_identity(token: &str, secret: &str) -> Result<Identity, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired".into())
        }
        _ => AppError::Unauthorized("Invalid token".into()),
    })?;

    token_data
        .claims
        .identity()
        .ok_or_else(|| AppError::Unauthorized("Invalid token claims".into()))
}

/// Extract a bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match request.headers().get(AUTHORIZATION) {
        None => return Err(AppError::Unauthorized("Missing authorization header".into())),
        Some(_) => bearer_token(request.headers()).ok_or_else(|| {
            AppError::Unauthorized("Invalid authorization header format".into())
        })?,
    };

    let identity = decode_identity(token, &state.settings.jwt.secret)?;

    // Insert authenticated user into request extensions
    request.extensions_mut().insert(AuthUser { identity });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "unit-test-secret-that-is-long-enough";

    fn token(claims: serde_json::Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn exp() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_identity_from_sub() {
        let identity = decode_identity(&token(json!({"sub": "42", "exp": exp()})), SECRET).unwrap();
        assert_eq!(identity, Identity::new("42"));
    }

    #[test]
    fn test_identity_falls_back_to_numeric_user_id() {
        let identity =
            decode_identity(&token(json!({"user_id": 7, "exp": exp()})), SECRET).unwrap();
        assert_eq!(identity, Identity::new("7"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = token(json!({"sub": "42", "exp": exp()}));
        let result = decode_identity(&token, "another-secret-that-is-long-enough!!");
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_token_without_identity_rejected() {
        let result = decode_identity(&token(json!({"exp": exp()})), SECRET);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
