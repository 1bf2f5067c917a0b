use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use chrono::{DateTime, Duration, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::{ApiTokenUser, AuthUser, CustomerUser};
use crate::auth::{api_token, jwt, password};
use crate::entities::status::{PaymentStatus, Role, TokenAction};
use crate::entities::{payment, token_log, user};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::ValidatedJson;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the auth route group: `/auth/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/token/generate", post(generate_api_token))
        .route("/auth/token/revoke", post(revoke_api_token))
        .route("/auth/token/verify", get(verify_api_token))
        .route(
            "/auth/customer/profile",
            get(get_profile).put(update_profile),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"), length(max = 150))]
    pub email: String,
    #[validate(custom(function = "password::password_policy"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 150))]
    pub company: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Serialize)]
pub struct AuthPayload {
    pub user: user::Model,
    pub token: String,
}

#[derive(Serialize)]
pub struct ApiTokenPayload {
    pub api_token: String,
    pub token_expiry: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct TokenVerification {
    pub user: user::Model,
    pub token_expiry: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn session_token(state: &AppState, user: &user::Model) -> Result<String, AppError> {
    Ok(jwt::issue_token(
        user.id,
        &user.email,
        &user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_secs,
    )?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

const EMAIL_TAKEN: &str = "Email already registered";

/// `POST /api/auth/register`: create a customer account and sign it in.
async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<ApiResponse<AuthPayload>, AppError> {
    let email = normalize_email(&req.email);

    let taken = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .count(&state.db)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
    }

    let now = Utc::now().fixed_offset();
    let user_model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(req.name.trim().to_string()),
        email: Set(email),
        password_hash: Set(password::hash_password(&req.password)?),
        role: Set(Role::User.as_str().to_string()),
        phone: Set(None),
        company: Set(None),
        address: Set(None),
        api_token_hash: Set(None),
        token_expiry: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(|err| AppError::on_unique_violation(err, EMAIL_TAKEN))?;

    tracing::info!(user_id = %user_model.id, "User registered");

    let token = session_token(&state, &user_model)?;
    Ok(ApiResponse::created(
        "User registered successfully",
        AuthPayload {
            user: user_model,
            token,
        },
    ))
}

/// `POST /api/auth/login`
async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<AuthPayload>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user_model = user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(&req.email)))
        .one(&state.db)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user_model.password_hash)? {
        return Err(invalid());
    }

    let token = session_token(&state, &user_model)?;
    Ok(ApiResponse::ok(
        "Login successful",
        AuthPayload {
            user: user_model,
            token,
        },
    ))
}

/// `POST /api/auth/token/generate`: issue a new API token, replacing any previous one.
async fn generate_api_token(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
) -> Result<ApiResponse<ApiTokenPayload>, AppError> {
    let raw = api_token::generate();
    let digest = api_token::digest(&raw);
    let now = Utc::now();
    let expiry = now + Duration::days(state.config.api_token_expires_days);
    let user_id = user_model.id;

    let txn = state.db.begin().await?;

    let mut active: user::ActiveModel = user_model.into();
    active.api_token_hash = Set(Some(digest.clone()));
    active.token_expiry = Set(Some(expiry.fixed_offset()));
    active.updated_at = Set(now.fixed_offset());
    active.update(&txn).await?;

    token_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        api_token_hash: Set(Some(digest)),
        action: Set(TokenAction::Created.as_str().to_string()),
        created_at: Set(now.fixed_offset()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    tracing::info!(user_id = %user_id, "API token generated");

    Ok(ApiResponse::ok(
        "API token generated successfully",
        ApiTokenPayload {
            api_token: raw,
            token_expiry: expiry,
        },
    ))
}

/// `POST /api/auth/token/revoke`
async fn revoke_api_token(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
) -> Result<ApiResponse<Option<()>>, AppError> {
    let Some(digest) = user_model.api_token_hash.clone() else {
        return Err(AppError::BadRequest(
            "No active token found to revoke".to_string(),
        ));
    };
    let now = Utc::now().fixed_offset();
    let user_id = user_model.id;

    let txn = state.db.begin().await?;

    token_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        api_token_hash: Set(Some(digest)),
        action: Set(TokenAction::Revoked.as_str().to_string()),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let mut active: user::ActiveModel = user_model.into();
    active.api_token_hash = Set(None);
    active.token_expiry = Set(None);
    active.updated_at = Set(now);
    active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!(user_id = %user_id, "API token revoked");

    Ok(ApiResponse::ok("API token revoked successfully", None))
}

/// `GET /api/auth/token/verify`: authenticated by API token, not JWT.
///
/// The holder must also have at least one completed payment.
async fn verify_api_token(
    State(state): State<AppState>,
    ApiTokenUser(user_model): ApiTokenUser,
) -> Result<ApiResponse<TokenVerification>, AppError> {
    let paid = payment::Entity::find()
        .filter(payment::Column::UserId.eq(user_model.id))
        .filter(payment::Column::Status.eq(PaymentStatus::Completed.as_str()))
        .count(&state.db)
        .await?;
    if paid == 0 {
        return Err(AppError::Forbidden("No active package".to_string()));
    }

    let token_expiry = user_model.token_expiry.map(|t| t.with_timezone(&Utc));
    Ok(ApiResponse::ok(
        "API token is valid",
        TokenVerification {
            user: user_model,
            token_expiry,
        },
    ))
}

/// `GET /api/auth/customer/profile`
async fn get_profile(CustomerUser(user_model): CustomerUser) -> ApiResponse<user::Model> {
    ApiResponse::ok("Profile retrieved successfully", user_model)
}

/// `PUT /api/auth/customer/profile`: only provided fields change.
async fn update_profile(
    State(state): State<AppState>,
    CustomerUser(user_model): CustomerUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<ApiResponse<user::Model>, AppError> {
    let mut active: user::ActiveModel = user_model.into();
    if let Some(name) = req.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(phone) = req.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(company) = req.company {
        active.company = Set(Some(company));
    }
    if let Some(address) = req.address {
        active.address = Set(Some(address));
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let updated = active.update(&state.db).await?;
    Ok(ApiResponse::ok("Profile updated successfully", updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_register_validation() {
        let req = RegisterRequest {
            name: "Ann".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };
        let errors = req.validate().err().unwrap_or_default();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("name"));
    }
}
