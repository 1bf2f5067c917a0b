use std::collections::HashMap;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AdminUser;
use crate::entities::status::PurchaseStatus;
use crate::entities::{package, purchase, user};
use crate::error::AppError;
use crate::response::{ApiResponse, ListQuery};
use crate::state::AppState;
use crate::validation::ValidatedJson;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the admin purchase route group: `/admin/purchases/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/purchases", get(list_purchases))
        .route(
            "/admin/purchases/{id}",
            get(get_purchase).delete(delete_purchase),
        )
        .route("/admin/purchases/{id}/status", patch(change_status))
        .route("/admin/purchases/user/{user_id}", get(list_user_purchases))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseStatusRequest {
    #[validate(custom(function = "crate::validation::rules::purchase_status"))]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct AdminPurchaseView {
    #[serde(flatten)]
    pub purchase: purchase::Model,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub package_name: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn find_purchase(db: &DatabaseConnection, id: Uuid) -> Result<purchase::Model, AppError> {
    purchase::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase not found".to_string()))
}

/// Attach buyer and package names to a page of purchases.
async fn decorate(
    db: &DatabaseConnection,
    purchases: Vec<purchase::Model>,
) -> Result<Vec<AdminPurchaseView>, AppError> {
    let users: HashMap<_, _> = user::Entity::find()
        .filter(user::Column::Id.is_in(purchases.iter().map(|p| p.user_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let packages: HashMap<_, _> = package::Entity::find()
        .filter(package::Column::Id.is_in(purchases.iter().map(|p| p.package_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    Ok(purchases
        .into_iter()
        .map(|purchase| {
            let buyer = users.get(&purchase.user_id);
            AdminPurchaseView {
                user_name: buyer.map(|u| u.name.clone()),
                user_email: buyer.map(|u| u.email.clone()),
                package_name: packages.get(&purchase.package_id).cloned(),
                purchase,
            }
        })
        .collect())
}

async fn paginate(
    db: &DatabaseConnection,
    mut find: Select<purchase::Entity>,
    query: &ListQuery,
) -> Result<ApiResponse<Vec<AdminPurchaseView>>, AppError> {
    if let Some(status) = query.status.as_deref() {
        find = find.filter(purchase::Column::Status.eq(status));
    }

    let total = find.clone().count(db).await?;
    let purchases = find
        .order_by_desc(purchase::Column::CreatedAt)
        .offset(query.offset())
        .limit(query.limit())
        .all(db)
        .await?;

    Ok(ApiResponse::paginated(
        "Purchases retrieved successfully",
        decorate(db, purchases).await?,
        query.pagination(total),
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /api/admin/purchases`: paginated, filterable by `status`.
async fn list_purchases(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<AdminPurchaseView>>, AppError> {
    paginate(&state.db, purchase::Entity::find(), &query).await
}

/// `GET /api/admin/purchases/user/{user_id}`
async fn list_user_purchases(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<AdminPurchaseView>>, AppError> {
    let find = purchase::Entity::find().filter(purchase::Column::UserId.eq(user_id));
    paginate(&state.db, find, &query).await
}

/// `GET /api/admin/purchases/{id}`
async fn get_purchase(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<AdminPurchaseView>, AppError> {
    let purchase = find_purchase(&state.db, id).await?;
    let view = decorate(&state.db, vec![purchase])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Purchase not found".to_string()))?;
    Ok(ApiResponse::ok("Purchase retrieved successfully", view))
}

/// `PATCH /api/admin/purchases/{id}/status`
async fn change_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<PurchaseStatusRequest>,
) -> Result<ApiResponse<purchase::Model>, AppError> {
    let status = PurchaseStatus::from_str(&req.status)
        .ok_or_else(|| AppError::BadRequest("Invalid purchase status".to_string()))?;
    let purchase = find_purchase(&state.db, id).await?;

    let mut active: purchase::ActiveModel = purchase.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().fixed_offset());
    let purchase = active.update(&state.db).await?;

    tracing::info!(purchase_id = %id, status = %status, "Purchase status changed");
    Ok(ApiResponse::ok("Purchase status updated", purchase))
}

/// `DELETE /api/admin/purchases/{id}`: projects created from it keep existing, unlinked.
async fn delete_purchase(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Option<()>>, AppError> {
    let purchase = find_purchase(&state.db, id).await?;
    purchase::Entity::delete_by_id(purchase.id)
        .exec(&state.db)
        .await?;

    tracing::info!(purchase_id = %id, "Purchase deleted");
    Ok(ApiResponse::ok("Purchase deleted successfully", None))
}
