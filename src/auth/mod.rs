//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` is the numeric account id. The
//! middleware turns a valid token into an [`AuthUser`] request extension, so
//! handlers take `Extension<AuthUser>` instead of digging through claims.

use crate::{config::AppConfig, errors::ServiceError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// JWT claims carried by every access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // account id
    pub role: String, // "user" or "admin"
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub account_id: i32,
    pub role: String,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let account_id = claims
            .sub
            .parse::<i32>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(AuthError::InvalidToken)?;
        Ok(Self {
            account_id,
            role: claims.role,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_issuer: String, access_token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            access_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.jwt_issuer.clone(),
            Duration::seconds(cfg.jwt_expiration as i64),
        )
    }
}

/// Issues and validates access tokens.
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issues a token for `account_id` with the configured lifetime.
    pub fn generate_token(&self, account_id: i32, role: &str) -> Result<String, AuthError> {
        self.generate_token_with_ttl(account_id, role, self.config.access_token_expiration)
    }

    pub fn generate_token_with_ttl(
        &self,
        account_id: i32,
        role: &str,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            role: role.to_string(),
            iss: self.config.jwt_issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Please log in first")]
    MissingToken,

    #[error("Please log in again")]
    InvalidToken,

    #[error("Token expired, please log in again!")]
    TokenExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Authentication service not available")]
    ServiceUnavailable,
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::Unauthorized(err.to_string())
            }
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(_) | AuthError::ServiceUnavailable => {
                ServiceError::InternalError(err.to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;
    Ok(token)
}

/// Authentication middleware that validates the bearer token
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => return AuthError::ServiceUnavailable.into_response(),
    };

    let user = bearer_token(request.headers())
        .and_then(|token| auth_service.validate_token(token))
        .and_then(AuthUser::try_from);

    match user {
        Ok(user) => {
            debug!(account_id = user.account_id, "request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            warn!(error = %e, path = %request.uri().path(), "authentication rejected");
            e.into_response()
        }
    }
}

/// Role-based access control middleware
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingToken)?;

    if !user.has_role(&required_role) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    const SECRET: &str = "unit_test_secret_that_is_long_enough_for_hs256";

    fn service() -> Arc<AuthService> {
        Arc::new(AuthService::new(AuthConfig::new(
            SECRET.into(),
            "roastery-api".into(),
            Duration::hours(1),
        )))
    }

    async fn whoami(Extension(user): Extension<AuthUser>) -> String {
        user.account_id.to_string()
    }

    fn app(auth: Arc<AuthService>) -> Router {
        let admin = Router::new()
            .route("/admin", get(whoami))
            .with_role("admin");
        Router::new()
            .route("/me", get(whoami))
            .with_auth()
            .merge(admin)
            .layer(Extension(auth))
    }

    async fn call(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[test]
    fn token_round_trip_yields_account() {
        let auth = service();
        let token = auth.generate_token(42, "user").unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iss, "roastery-api");

        let user = AuthUser::try_from(claims).unwrap();
        assert_eq!(user.account_id, 42);
        assert!(user.has_role("user"));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let auth = service();
        let token = auth
            .generate_token_with_ttl(1, "user", Duration::minutes(-5))
            .unwrap();
        assert_matches!(auth.validate_token(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let other = AuthService::new(AuthConfig::new(
            SECRET.into(),
            "someone-else".into(),
            Duration::hours(1),
        ));
        let token = other.generate_token(1, "user").unwrap();
        assert_matches!(service().validate_token(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let claims = Claims {
            sub: "abc".into(),
            role: "user".into(),
            iss: "roastery-api".into(),
            iat: 0,
            exp: 0,
        };
        assert_matches!(AuthUser::try_from(claims), Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn missing_token_gets_401_envelope() {
        let (status, body) = call(app(service()), "/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Please log in first");
    }

    #[tokio::test]
    async fn garbage_token_asks_to_log_in_again() {
        let (status, body) = call(app(service()), "/me", Some("not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Please log in again");
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let auth = service();
        let token = auth.generate_token(7, "user").unwrap();
        let response = app(auth)
            .oneshot(
                HttpRequest::builder()
                    .uri("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"7");
    }

    #[tokio::test]
    async fn role_gate_returns_403() {
        let auth = service();
        let token = auth.generate_token(7, "user").unwrap();
        let (status, _) = call(app(auth.clone()), "/admin", Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin_token = auth.generate_token(1, "admin").unwrap();
        let (status, _) = call(app(auth), "/admin", Some(&admin_token)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
