use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user ID as a UUID string.
    pub sub: String,
    pub email: String,
    /// User role: `"user"` or `"admin"`.
    pub role: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued-at time (Unix timestamp).
    pub iat: i64,
}

/// Issue an HS256 session token.
///
/// # Errors
///
/// Returns an error if JWT encoding fails.
pub fn issue_token(
    user_id: Uuid,
    email: &str,
    role: &str,
    secret: &str,
    ttl_secs: u64,
) -> anyhow::Result<String> {
    let now = Utc::now().timestamp();
    let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: now.saturating_add(ttl),
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to encode token: {e}"))
}

/// Validate a session token and return its claims.
///
/// # Errors
///
/// Returns an error if the signature does not match or the token has expired.
pub fn validate_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| anyhow::anyhow!("Invalid token: {e}"))?;

    Ok(token_data.claims)
}
