use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use sea_orm::EntityTrait;

use crate::auth::{api_token, bearer_token, jwt};
use crate::db::queries;
use crate::entities::status::Role;
use crate::entities::user;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from the `Authorization: Bearer <jwt>` header.
///
/// The role in the token must still match the stored account, so a demoted admin's
/// old token stops working.
///
/// ```ignore
/// async fn handler(AuthUser(user): AuthUser) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = jwt::validate_token(token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token.".to_string()))?;

        let user_id: uuid::Uuid = claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid token subject.".to_string()))?;

        let user_model = user::Entity::find_by_id(user_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found.".to_string()))?;

        if user_model.role != claims.role {
            return Err(AppError::Unauthorized(
                "Token no longer matches the account role.".to_string(),
            ));
        }

        Ok(Self(user_model))
    }
}

/// Requires the authenticated user to be a customer (`"user"` role).
#[derive(Debug, Clone)]
pub struct CustomerUser(pub user::Model);

impl FromRequestParts<AppState> for CustomerUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_model) = AuthUser::from_request_parts(parts, state).await?;

        if Role::from_str(&user_model.role) != Some(Role::User) {
            return Err(AppError::Forbidden("Customer access required.".to_string()));
        }

        Ok(Self(user_model))
    }
}

/// Requires the authenticated user to have the `"admin"` role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_model) = AuthUser::from_request_parts(parts, state).await?;

        if Role::from_str(&user_model.role) != Some(Role::Admin) {
            return Err(AppError::Forbidden("Admin role required.".to_string()));
        }

        Ok(Self(user_model))
    }
}

/// User authenticated by a raw API token in `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct ApiTokenUser(pub user::Model);

impl FromRequestParts<AppState> for ApiTokenUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let digest = api_token::digest(token);

        let user_model = queries::find_user_by_token_hash(&state.db, &digest)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid API token.".to_string()))?;

        let expired = user_model
            .token_expiry
            .is_none_or(|expiry| expiry <= Utc::now());
        if expired {
            return Err(AppError::Forbidden("API token expired.".to_string()));
        }

        Ok(Self(user_model))
    }
}
