pub mod api_token;
pub mod jwt;
pub mod middleware;
pub mod password;

use axum::http::request::Parts;

use crate::error::AppError;

/// Pull the bearer credential out of the `Authorization` header.
///
/// # Errors
///
/// Returns [`AppError::Unauthorized`] when the header is missing or not a bearer token.
pub fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header.".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format.".to_string()))
}
