use std::collections::HashMap;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, patch};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AdminUser;
use crate::db::queries;
use crate::entities::status::{DiscountType, PackageStatus, PlanStatus, PlanType};
use crate::entities::{package, package_plan, project, purchase};
use crate::error::AppError;
use crate::response::{ApiResponse, ListQuery};
use crate::services::plan_validation::{PlanKey, validate_duplicate_plans};
use crate::services::pricing::final_price;
use crate::state::AppState;
use crate::validation::ValidatedJson;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the admin package route group: `/admin/package/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/package", get(list_packages).post(create_package))
        .route(
            "/admin/package/{id}",
            get(get_package).put(update_package).delete(delete_package),
        )
        .route("/admin/package/{id}/status", patch(change_package_status))
        .route("/admin/package/plan/{id}/status", patch(change_plan_status))
        .route("/admin/package/plan/{id}", delete(delete_plan))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlanInput {
    /// Present when editing an existing plan.
    pub id: Option<Uuid>,
    #[validate(custom(function = "crate::validation::rules::plan_type"))]
    pub plan_type: String,
    #[validate(range(min = 1, max = 3650, message = "Duration must be between 1 and 3650 days"))]
    pub duration_days: i32,
    #[validate(custom(function = "crate::validation::rules::non_negative"))]
    pub price: Decimal,
    #[validate(custom(function = "crate::validation::rules::discount_type"))]
    pub discount_type: Option<String>,
    #[validate(custom(function = "crate::validation::rules::non_negative"))]
    pub discount_value: Option<Decimal>,
    #[validate(custom(function = "crate::validation::rules::plan_status"))]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePackageRequest {
    #[validate(length(min = 3, max = 100, message = "Package name must be at least 3 characters long"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "crate::validation::rules::package_status"))]
    pub status: Option<String>,
    #[validate(range(min = 1, message = "Max projects must be at least 1"))]
    pub max_projects: Option<i32>,
    #[validate(range(min = 1, message = "Max tables per project must be at least 1"))]
    pub max_tables_per_project: Option<i32>,
    pub features: Option<Value>,
    #[serde(default)]
    #[validate(nested)]
    pub plans: Vec<PlanInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePackageRequest {
    #[validate(length(min = 3, max = 100, message = "Package name must be at least 3 characters long"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "crate::validation::rules::package_status"))]
    pub status: Option<String>,
    #[validate(range(min = 1, message = "Max projects must be at least 1"))]
    pub max_projects: Option<i32>,
    #[validate(range(min = 1, message = "Max tables per project must be at least 1"))]
    pub max_tables_per_project: Option<i32>,
    pub features: Option<Value>,
    #[validate(nested)]
    pub plans: Option<Vec<PlanInput>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PackageStatusRequest {
    #[validate(custom(function = "crate::validation::rules::package_status"))]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlanStatusRequest {
    #[validate(custom(function = "crate::validation::rules::plan_status"))]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct PackageWithPlans {
    #[serde(flatten)]
    pub package: package::Model,
    pub plans: Vec<package_plan::Model>,
}

/// A plan request after its strings have been parsed.
struct ParsedPlan {
    id: Option<Uuid>,
    plan_type: PlanType,
    duration_days: i32,
    price: Decimal,
    discount_type: Option<DiscountType>,
    discount_value: Option<Decimal>,
    status: Option<PlanStatus>,
}

impl ParsedPlan {
    fn parse(input: &PlanInput) -> Result<Self, AppError> {
        let plan_type = PlanType::parse_lenient(&input.plan_type)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid plan type: {}", input.plan_type)))?;
        let discount_type = match input.discount_type.as_deref() {
            None => None,
            Some(raw) => Some(DiscountType::from_str(raw).ok_or_else(|| {
                AppError::BadRequest(format!("Invalid discount type: {raw}"))
            })?),
        };
        let status = match input.status.as_deref() {
            None => None,
            Some(raw) => Some(
                PlanStatus::from_str(raw)
                    .ok_or_else(|| AppError::BadRequest(format!("Invalid plan status: {raw}")))?,
            ),
        };
        Ok(Self {
            id: input.id,
            plan_type,
            duration_days: input.duration_days,
            price: input.price,
            discount_type,
            discount_value: input.discount_value,
            status,
        })
    }

    fn final_price(&self) -> Decimal {
        final_price(self.price, self.discount_type, self.discount_value)
    }

    /// Key used for duplicate detection; `keep_id` decides whether edits stay exempt.
    fn key(&self, keep_id: bool) -> PlanKey {
        PlanKey {
            id: if keep_id { self.id } else { None },
            plan_type: self.plan_type.as_str().to_string(),
            duration_days: self.duration_days,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn find_package(db: &DatabaseConnection, id: Uuid) -> Result<package::Model, AppError> {
    package::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Package not found".to_string()))
}

/// Load a package and hold its row lock until `txn` ends.
///
/// Every plan writer goes through here, so a duplicate check sees the plans it will
/// be written next to.
async fn lock_package(txn: &DatabaseTransaction, id: Uuid) -> Result<package::Model, AppError> {
    package::Entity::find_by_id(id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Package not found".to_string()))
}

async fn plans_by_package<C: ConnectionTrait>(
    conn: &C,
    package_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<package_plan::Model>>, AppError> {
    let mut grouped: HashMap<Uuid, Vec<package_plan::Model>> = HashMap::new();
    let plans = package_plan::Entity::find()
        .filter(package_plan::Column::PackageId.is_in(package_ids))
        .order_by_asc(package_plan::Column::DurationDays)
        .all(conn)
        .await?;
    for plan in plans {
        grouped.entry(plan.package_id).or_default().push(plan);
    }
    Ok(grouped)
}

async fn with_plans<C: ConnectionTrait>(
    conn: &C,
    package: package::Model,
) -> Result<PackageWithPlans, AppError> {
    let plans = plans_by_package(conn, vec![package.id])
        .await?
        .remove(&package.id)
        .unwrap_or_default();
    Ok(PackageWithPlans { package, plans })
}

fn reject_duplicates(candidates: &[PlanKey], existing: &[PlanKey]) -> Result<(), AppError> {
    validate_duplicate_plans(candidates, existing).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn new_plan_model(package_id: Uuid, plan: &ParsedPlan) -> package_plan::ActiveModel {
    let now = Utc::now().fixed_offset();
    package_plan::ActiveModel {
        id: Set(Uuid::new_v4()),
        package_id: Set(package_id),
        plan_type: Set(plan.plan_type.as_str().to_string()),
        duration_days: Set(plan.duration_days),
        price: Set(plan.price),
        discount_type: Set(plan.discount_type.map(|d| d.as_str().to_string())),
        discount_value: Set(plan.discount_value),
        final_price: Set(plan.final_price()),
        status: Set(plan.status.unwrap_or(PlanStatus::Active).as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

async fn count_purchases(
    db: &DatabaseConnection,
    column: purchase::Column,
    id: Uuid,
) -> Result<u64, AppError> {
    Ok(purchase::Entity::find()
        .filter(column.eq(id))
        .count(db)
        .await?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/admin/package`: create a package together with its plans.
async fn create_package(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ValidatedJson(req): ValidatedJson<CreatePackageRequest>,
) -> Result<ApiResponse<PackageWithPlans>, AppError> {
    let plans = req
        .plans
        .iter()
        .map(ParsedPlan::parse)
        .collect::<Result<Vec<_>, _>>()?;
    let active_keys: Vec<PlanKey> = plans
        .iter()
        .filter(|p| p.status.unwrap_or(PlanStatus::Active) == PlanStatus::Active)
        .map(|p| p.key(false))
        .collect();
    reject_duplicates(&active_keys, &[])?;

    let status = req
        .status
        .as_deref()
        .and_then(PackageStatus::from_str)
        .unwrap_or(PackageStatus::Active);
    let now = Utc::now().fixed_offset();

    let txn = state.db.begin().await?;

    let package = package::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(req.name.trim().to_string()),
        description: Set(req.description),
        status: Set(status.as_str().to_string()),
        max_projects: Set(req.max_projects.unwrap_or(1)),
        max_tables_per_project: Set(req.max_tables_per_project.unwrap_or(10)),
        sell_count: Set(0),
        features: Set(req.features),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    for plan in &plans {
        new_plan_model(package.id, plan).insert(&txn).await?;
    }

    let body = with_plans(&txn, package).await?;
    txn.commit().await?;

    tracing::info!(package_id = %body.package.id, plans = body.plans.len(), "Package created");
    Ok(ApiResponse::created("Package created successfully", body))
}

/// `GET /api/admin/package`: paginated, filterable by `search` (name) and `status`.
async fn list_packages(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<PackageWithPlans>>, AppError> {
    let mut find = package::Entity::find();
    if let Some(term) = query.search_term() {
        find = find.filter(package::Column::Name.contains(term));
    }
    if let Some(status) = query.status.as_deref() {
        find = find.filter(package::Column::Status.eq(status));
    }

    let total = find.clone().count(&state.db).await?;
    let packages = find
        .order_by_desc(package::Column::CreatedAt)
        .offset(query.offset())
        .limit(query.limit())
        .all(&state.db)
        .await?;

    let mut plans = plans_by_package(&state.db, packages.iter().map(|p| p.id).collect()).await?;
    let data = packages
        .into_iter()
        .map(|package| PackageWithPlans {
            plans: plans.remove(&package.id).unwrap_or_default(),
            package,
        })
        .collect();

    Ok(ApiResponse::paginated(
        "Packages retrieved successfully",
        data,
        query.pagination(total),
    ))
}

/// `GET /api/admin/package/{id}`
async fn get_package(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<PackageWithPlans>, AppError> {
    let package = find_package(&state.db, id).await?;
    let body = with_plans(&state.db, package).await?;
    Ok(ApiResponse::ok("Package retrieved successfully", body))
}

/// `PUT /api/admin/package/{id}`: update package fields and upsert plans.
///
/// Plans carrying an `id` are edited in place, the rest are inserted. Every plan is
/// re-priced. The resulting active set must not collide with itself or with the
/// package's other active plans.
async fn update_package(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdatePackageRequest>,
) -> Result<ApiResponse<PackageWithPlans>, AppError> {
    let plans = req
        .plans
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(ParsedPlan::parse)
        .collect::<Result<Vec<_>, _>>()?;

    let now = Utc::now().fixed_offset();
    let txn = state.db.begin().await?;
    let package = lock_package(&txn, id).await?;

    let stored: HashMap<Uuid, package_plan::Model> = plans_by_package(&txn, vec![id])
        .await?
        .remove(&id)
        .unwrap_or_default()
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    if let Some(foreign) = plans
        .iter()
        .filter_map(|p| p.id)
        .find(|plan_id| !stored.contains_key(plan_id))
    {
        return Err(AppError::BadRequest(format!(
            "Plan {foreign} does not belong to this package"
        )));
    }

    // Edited plans keep their stored status unless the request changes it.
    let resulting_status = |plan: &ParsedPlan| {
        plan.status.unwrap_or_else(|| {
            plan.id
                .and_then(|pid| stored.get(&pid))
                .and_then(|p| PlanStatus::from_str(&p.status))
                .unwrap_or(PlanStatus::Active)
        })
    };
    let edited: Vec<Uuid> = plans.iter().filter_map(|p| p.id).collect();
    let candidates: Vec<PlanKey> = plans
        .iter()
        .filter(|p| resulting_status(p) == PlanStatus::Active)
        .map(|p| p.key(false))
        .collect();
    let existing: Vec<PlanKey> = queries::active_plans_of_package(&txn, id, &edited)
        .await?
        .iter()
        .map(PlanKey::from)
        .collect();
    reject_duplicates(&candidates, &existing)?;

    let mut active: package::ActiveModel = package.into();
    if let Some(name) = req.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = req.description {
        active.description = Set(Some(description));
    }
    if let Some(status) = req.status.as_deref().and_then(PackageStatus::from_str) {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(max_projects) = req.max_projects {
        active.max_projects = Set(max_projects);
    }
    if let Some(max_tables) = req.max_tables_per_project {
        active.max_tables_per_project = Set(max_tables);
    }
    if let Some(features) = req.features {
        active.features = Set(Some(features));
    }
    active.updated_at = Set(now);
    let package = active.update(&txn).await?;

    for plan in &plans {
        match plan.id.and_then(|pid| stored.get(&pid)) {
            Some(existing_plan) => {
                let mut edit: package_plan::ActiveModel = existing_plan.clone().into();
                edit.plan_type = Set(plan.plan_type.as_str().to_string());
                edit.duration_days = Set(plan.duration_days);
                edit.price = Set(plan.price);
                edit.discount_type = Set(plan.discount_type.map(|d| d.as_str().to_string()));
                edit.discount_value = Set(plan.discount_value);
                edit.final_price = Set(plan.final_price());
                edit.status = Set(resulting_status(plan).as_str().to_string());
                edit.updated_at = Set(now);
                edit.update(&txn).await?;
            }
            None => {
                new_plan_model(package.id, plan).insert(&txn).await?;
            }
        }
    }

    let body = with_plans(&txn, package).await?;
    txn.commit().await?;

    tracing::info!(package_id = %id, plans = plans.len(), "Package updated");
    Ok(ApiResponse::ok("Package updated successfully", body))
}

/// `PATCH /api/admin/package/{id}/status`
async fn change_package_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<PackageStatusRequest>,
) -> Result<ApiResponse<package::Model>, AppError> {
    let status = PackageStatus::from_str(&req.status)
        .ok_or_else(|| AppError::BadRequest("Invalid package status".to_string()))?;
    let package = find_package(&state.db, id).await?;

    let mut active: package::ActiveModel = package.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().fixed_offset());
    let package = active.update(&state.db).await?;

    Ok(ApiResponse::ok("Package status updated", package))
}

/// `DELETE /api/admin/package/{id}`: refused while any purchase references the package.
async fn delete_package(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Option<()>>, AppError> {
    let package = find_package(&state.db, id).await?;

    if count_purchases(&state.db, purchase::Column::PackageId, id).await? > 0 {
        return Err(AppError::Conflict(
            "Package has purchases and cannot be deleted".to_string(),
        ));
    }

    let txn = state.db.begin().await?;
    package_plan::Entity::delete_many()
        .filter(package_plan::Column::PackageId.eq(id))
        .exec(&txn)
        .await?;
    package::Entity::delete_by_id(package.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(package_id = %id, "Package deleted");
    Ok(ApiResponse::ok("Package deleted successfully", None))
}

/// `PATCH /api/admin/package/plan/{id}/status`
///
/// Reactivating a plan is refused if another active plan of the package already has
/// the same type and duration.
async fn change_plan_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<PlanStatusRequest>,
) -> Result<ApiResponse<package_plan::Model>, AppError> {
    let status = PlanStatus::from_str(&req.status)
        .ok_or_else(|| AppError::BadRequest("Invalid plan status".to_string()))?;
    let txn = state.db.begin().await?;
    let plan = package_plan::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Package plan not found".to_string()))?;

    if status == PlanStatus::Active && !plan.is_active() {
        lock_package(&txn, plan.package_id).await?;
        let existing: Vec<PlanKey> =
            queries::active_plans_of_package(&txn, plan.package_id, &[plan.id])
                .await?
                .iter()
                .map(PlanKey::from)
                .collect();
        let candidate = PlanKey {
            id: None,
            ..PlanKey::from(&plan)
        };
        reject_duplicates(&[candidate], &existing)?;
    }

    let mut active: package_plan::ActiveModel = plan.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().fixed_offset());
    let plan = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::ok("Package plan status updated", plan))
}

/// `DELETE /api/admin/package/plan/{id}`: refused once the plan has been purchased.
async fn delete_plan(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Option<()>>, AppError> {
    let plan = package_plan::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Package plan not found".to_string()))?;

    let in_use = count_purchases(&state.db, purchase::Column::PackagePlanId, id).await?
        + project::Entity::find()
            .filter(project::Column::PackagePlanId.eq(id))
            .count(&state.db)
            .await?;
    if in_use > 0 {
        return Err(AppError::Conflict(
            "Package plan has been purchased and cannot be deleted".to_string(),
        ));
    }

    package_plan::Entity::delete_by_id(plan.id)
        .exec(&state.db)
        .await?;

    tracing::info!(package_plan_id = %id, "Package plan deleted");
    Ok(ApiResponse::ok("Package plan deleted successfully", None))
}
