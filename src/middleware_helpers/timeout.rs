use crate::errors::ServiceError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;

/// Bounds the whole request. Handlers that open a database transaction
/// roll it back when their future is dropped here.
pub async fn request_timeout_middleware(
    State(budget): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(budget, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(path = %path, budget_ms = budget.as_millis() as u64, "request timed out");
            ServiceError::Timeout(path).into_response()
        }
    }
}
