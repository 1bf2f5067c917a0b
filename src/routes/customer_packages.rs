use std::collections::HashMap;

use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::CustomerUser;
use crate::db::queries;
use crate::entities::status::{PackageStatus, PlanStatus};
use crate::entities::{package, package_plan, purchase};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::services::purchase::{self as purchase_service, PLAN_NOT_FOUND, PurchaseSummary};
use crate::state::AppState;
use crate::validation::ValidatedJson;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the customer catalogue route group: `/customer/package/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customer/package", get(list_catalogue))
        .route("/customer/package/plan/{id}", get(get_plan))
        .route("/customer/package/buy", post(buy_plan))
        .route("/customer/package/purchased", get(purchased))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct BuyRequest {
    pub package_plan_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CatalogueEntry {
    #[serde(flatten)]
    pub package: package::Model,
    pub plans: Vec<package_plan::Model>,
}

#[derive(Debug, Serialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: package_plan::Model,
    pub package: package::Model,
}

#[derive(Debug, Serialize)]
pub struct PurchaseConfirmation {
    pub purchase: purchase::Model,
    pub package_name: String,
    pub plan_type: String,
    pub duration_days: i32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /api/customer/package`: active packages, each with its active plans.
///
/// Packages without any active plan are left out since nothing in them can be bought.
async fn list_catalogue(
    State(state): State<AppState>,
    CustomerUser(_user): CustomerUser,
) -> Result<ApiResponse<Vec<CatalogueEntry>>, AppError> {
    let packages = package::Entity::find()
        .filter(package::Column::Status.eq(PackageStatus::Active.as_str()))
        .order_by_asc(package::Column::Name)
        .all(&state.db)
        .await?;

    let mut plans: HashMap<Uuid, Vec<package_plan::Model>> = HashMap::new();
    for plan in package_plan::Entity::find()
        .filter(package_plan::Column::PackageId.is_in(packages.iter().map(|p| p.id)))
        .filter(package_plan::Column::Status.eq(PlanStatus::Active.as_str()))
        .order_by_asc(package_plan::Column::DurationDays)
        .all(&state.db)
        .await?
    {
        plans.entry(plan.package_id).or_default().push(plan);
    }

    let catalogue = packages
        .into_iter()
        .filter_map(|package| {
            plans
                .remove(&package.id)
                .map(|plans| CatalogueEntry { package, plans })
        })
        .collect();

    Ok(ApiResponse::ok("Packages fetched successfully", catalogue))
}

/// `GET /api/customer/package/plan/{id}`
async fn get_plan(
    State(state): State<AppState>,
    CustomerUser(_user): CustomerUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<PlanDetail>, AppError> {
    let (plan, package) = queries::find_plan_with_package(&state.db, id)
        .await?
        .filter(|(plan, package)| {
            plan.is_active()
                && PackageStatus::from_str(&package.status) == Some(PackageStatus::Active)
        })
        .ok_or_else(|| AppError::NotFound(PLAN_NOT_FOUND.to_string()))?;

    Ok(ApiResponse::ok(
        "Package plan fetched successfully",
        PlanDetail { plan, package },
    ))
}

/// `POST /api/customer/package/buy`
async fn buy_plan(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    ValidatedJson(req): ValidatedJson<BuyRequest>,
) -> Result<ApiResponse<PurchaseConfirmation>, AppError> {
    let receipt = purchase_service::purchase_plan(&state.db, user.id, req.package_plan_id).await?;

    Ok(ApiResponse::created(
        "Package purchased successfully",
        PurchaseConfirmation {
            package_name: receipt.package.name,
            plan_type: receipt.plan.plan_type,
            duration_days: receipt.plan.duration_days,
            purchase: receipt.purchase,
        },
    ))
}

/// `GET /api/customer/package/purchased`: the caller's purchase history.
async fn purchased(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> Result<ApiResponse<Vec<PurchaseSummary>>, AppError> {
    let history = purchase_service::purchase_history(&state.db, user.id, Utc::now()).await?;
    Ok(ApiResponse::ok("Purchased packages fetched successfully", history))
}
