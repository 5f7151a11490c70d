use crate::{
    errors::{ApiError, ServiceError},
    ApiResponse,
};
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data).with_message(message))
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input.validate().map_err(ApiError::from)
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Treats blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Request body accepted as JSON or as `application/x-www-form-urlencoded`.
///
/// Any decoding failure is reported as `invalid JSON format`.
#[derive(Debug, Clone)]
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state).await.map_err(|e| {
                tracing::debug!(error = %e, "form body rejected");
                ApiError::MalformedBody
            })?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
                tracing::debug!(error = %e, "json body rejected");
                ApiError::MalformedBody
            })?;
            Ok(Self(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        id_delivery: Option<i32>,
        fullname: Option<String>,
    }

    async fn extract(content_type: &str, body: &'static str) -> Result<Payload, ApiError> {
        let req = axum::http::Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        JsonOrForm::<Payload>::from_request(req, &())
            .await
            .map(|JsonOrForm(p)| p)
    }

    #[tokio::test]
    async fn accepts_json_and_form() {
        let json = extract("application/json", r#"{"id_delivery": 2, "fullname": "Jo"}"#)
            .await
            .unwrap();
        let form = extract("application/x-www-form-urlencoded", "id_delivery=2&fullname=Jo")
            .await
            .unwrap();
        assert_eq!(json, form);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let err = extract("application/json", "{not json").await.unwrap_err();
        assert!(matches!(err, ApiError::MalformedBody));
    }

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" Jo ".into())), Some("Jo".into()));
        assert_eq!(non_blank(None), None);
    }
}
