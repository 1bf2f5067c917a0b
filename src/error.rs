use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::{DbErr, SqlErr};
use serde_json::{Value, json};

/// Failure body and internal error text, parked on the response extensions.
///
/// Only [`attach_error_details`] reads it; without that layer the text never leaves
/// the process.
#[derive(Debug, Clone)]
struct ErrorDetails {
    body: Value,
    details: String,
}

/// Response mapper that copies the internal error text of a failure into its body as
/// `details`. Installed by [`crate::routes::app`] outside production.
pub async fn attach_error_details(mut response: Response) -> Response {
    match response.extensions_mut().remove::<ErrorDetails>() {
        Some(ErrorDetails { mut body, details }) => {
            body["details"] = json!(details);
            (response.status(), Json(body)).into_response()
        }
        None => response,
    }
}

/// Unified application error type that maps to JSON HTTP responses.
///
/// Failures are rendered in the same envelope as successes:
/// `{ "status": false, "message": "...", "data": null, "code": "..." }`.
#[derive(Debug)]
pub enum AppError {
    /// 400 Bad Request
    BadRequest(String),
    /// 401 Unauthorized
    Unauthorized(String),
    /// 403 Forbidden (quota exhausted, missing purchase, wrong role)
    Forbidden(String),
    /// 404 Not Found
    NotFound(String),
    /// 409 Conflict
    Conflict(String),
    /// 500 with a caller-facing message; the wrapped error is only logged
    Failed(String, anyhow::Error),
    /// 500 Internal Server Error (wraps any error, logs details, returns generic message)
    Internal(anyhow::Error),
}

impl AppError {
    /// Wrap an internal failure but keep a workflow-specific message for the caller.
    pub fn failed(message: &str, err: impl Into<anyhow::Error>) -> Self {
        Self::Failed(message.to_string(), err.into())
    }

    /// 409 with `message` when `err` is a unique-index violation, otherwise internal.
    ///
    /// Covers the insert that loses a race after an existence check passed.
    #[must_use]
    pub fn on_unique_violation(err: DbErr, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict(message.to_string()),
            _ => Self::from(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            Self::Failed(msg, err) => {
                tracing::error!("{msg}: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    msg,
                    Some(format!("{err:#}")),
                )
            }
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    Some(format!("{err:#}")),
                )
            }
        };

        let body = json!({
            "status": false,
            "message": message,
            "data": null,
            "code": code,
        });

        let mut response = (status, Json(body.clone())).into_response();
        if let Some(details) = details {
            response
                .extensions_mut()
                .insert(ErrorDetails { body, details });
        }
        response
    }
}

/// Allow `?` to automatically convert any `anyhow::Error` into `AppError::Internal`.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::BadRequest(String::new()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized(String::new()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden(String::new()), StatusCode::FORBIDDEN),
            (AppError::NotFound(String::new()), StatusCode::NOT_FOUND),
            (AppError::Conflict(String::new()), StatusCode::CONFLICT),
            (
                AppError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .map(http_body_util::Collected::to_bytes)
            .unwrap_or_default();
        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_details_hidden_without_layer() {
        let response = AppError::Internal(anyhow::anyhow!("disk full")).into_response();
        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_attach_error_details() {
        let response = AppError::failed("Failed to purchase package", anyhow::anyhow!("db down"))
            .into_response();
        let response = attach_error_details(response).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Failed to purchase package");
        assert_eq!(body["details"], "db down");
    }

    #[tokio::test]
    async fn test_client_errors_carry_no_details() {
        let response = AppError::NotFound("gone".to_string()).into_response();
        let body = body_json(attach_error_details(response).await).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_failed_keeps_message() {
        let err = AppError::failed("Failed to purchase package", anyhow::anyhow!("db down"));
        assert!(matches!(err, AppError::Failed(ref msg, _) if msg == "Failed to purchase package"));
    }
}
