use axum::Router;
use axum::extract::State;
use axum::routing::get;
use chrono::Utc;

use crate::auth::middleware::{AdminUser, CustomerUser};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::services::dashboard::{self, AdminDashboard, CustomerDashboard};
use crate::state::AppState;

/// Build the dashboard route group.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(admin_dashboard))
        .route("/customer/dashboard", get(customer_dashboard))
}

/// `GET /api/admin/dashboard`
async fn admin_dashboard(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<ApiResponse<AdminDashboard>, AppError> {
    let data = dashboard::admin_dashboard(&state.db, Utc::now())
        .await
        .map_err(|e| AppError::failed("Failed to load dashboard", e))?;
    Ok(ApiResponse::ok("Dashboard data fetched successfully", data))
}

/// `GET /api/customer/dashboard`
async fn customer_dashboard(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> Result<ApiResponse<CustomerDashboard>, AppError> {
    let data = dashboard::customer_dashboard(&state.db, user.id, Utc::now())
        .await
        .map_err(|e| AppError::failed("Failed to load dashboard", e))?;
    Ok(ApiResponse::ok("Dashboard data fetched successfully", data))
}
