use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{ValidationErrors, ValidationErrorsKind};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Failure envelope shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human-readable error description
    pub message: String,
    /// Field-level messages for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error was produced
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(message: String, errors: Option<Vec<String>>) -> Self {
        Self {
            success: false,
            message,
            errors,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("{0}")]
    NotFound(String),

    /// A required or malformed field; the message names the field.
    #[error("{0}")]
    ValidationError(String),

    #[error("cart is empty, can't place an order")]
    EmptyCart,

    #[error("product_id_{product_id} stock not enough")]
    InsufficientStock { product_id: i32 },

    #[error("product is out of stock")]
    OutOfStock,

    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_)
            | Self::EmptyCart
            | Self::InsufficientStock { .. }
            | Self::OutOfStock
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AuthError(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DatabaseError(_)
            | Self::Timeout(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::Timeout(_) => "Request timed out".to_string(),
            _ => self.to_string(),
        }
    }

    /// True for failures the caller can fix by changing input or state.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse::new(self.response_message(), None);
        (status, Json(body)).into_response()
    }
}

/// Handler-level errors: request decoding and input validation
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("invalid JSON format")]
    MalformedBody,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(validation_messages(&errors))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(err) => err.into_response(),
            ApiError::Validation(messages) => {
                let body = ErrorResponse::new(messages.join(", "), Some(messages));
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::MalformedBody => {
                let body = ErrorResponse::new("invalid JSON format".to_string(), None);
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Unauthorized(message) => {
                let body = ErrorResponse::new(message, None);
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
        }
    }
}

/// Flattens validator output into one readable message per failing rule,
/// sorted by field name so responses are stable.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    let mut messages = Vec::new();
    for (field, kind) in fields {
        if let ValidationErrorsKind::Field(field_errors) = kind {
            for err in field_errors {
                messages.push(field_message(field, err));
            }
        }
    }
    messages
}

fn field_message(field: &str, err: &validator::ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    // range bounds arrive as floats
    let param = |name: &str| match err.params.get(name) {
        Some(serde_json::Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
        None => String::new(),
    };
    match err.code.as_ref() {
        "required" => format!("{} is required", field),
        "email" => "invalid email format".to_string(),
        "length" if err.params.contains_key("equal") => {
            format!("{} must be exactly {} characters", field, param("equal"))
        }
        "length" if err.params.contains_key("max") => {
            format!("{} must be at most {} characters", field, param("max"))
        }
        "range" if err.params.contains_key("min") && err.params.contains_key("max") => format!(
            "{} must be between {} and {}",
            field,
            param("min"),
            param("max")
        ),
        "range" if err.params.contains_key("min") => {
            format!("{} must be greater than or equal to {}", field, param("min"))
        }
        _ => format!("{} is invalid", field),
    }
}

/// Builds a validator error carrying a fixed message.
pub fn rule_violation(code: &'static str, message: &'static str) -> validator::ValidationError {
    let mut err = validator::ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}
