use std::collections::HashMap;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AdminUser;
use crate::entities::status::ProjectStatus;
use crate::entities::{project, project_table, user};
use crate::error::AppError;
use crate::response::{ApiResponse, ListQuery};
use crate::state::AppState;
use crate::validation::ValidatedJson;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the admin project route group: `/admin/projects/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/projects", get(list_projects))
        .route(
            "/admin/projects/{id}",
            get(get_project).delete(delete_project),
        )
        .route("/admin/projects/{id}/status", patch(change_status))
        .route("/admin/projects/user/{user_id}", get(list_user_projects))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ProjectStatusRequest {
    #[validate(custom(function = "crate::validation::rules::project_status"))]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct AdminProjectView {
    #[serde(flatten)]
    pub project: project::Model,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminProjectDetail {
    #[serde(flatten)]
    pub project: AdminProjectView,
    pub tables: Vec<project_table::Model>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn find_project(db: &DatabaseConnection, id: Uuid) -> Result<project::Model, AppError> {
    project::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
}

async fn with_owners(
    db: &DatabaseConnection,
    projects: Vec<project::Model>,
) -> Result<Vec<AdminProjectView>, AppError> {
    let owners: HashMap<_, _> = user::Entity::find()
        .filter(user::Column::Id.is_in(projects.iter().map(|p| p.user_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(projects
        .into_iter()
        .map(|project| {
            let owner = owners.get(&project.user_id);
            AdminProjectView {
                owner_name: owner.map(|u| u.name.clone()),
                owner_email: owner.map(|u| u.email.clone()),
                project,
            }
        })
        .collect())
}

async fn paginate(
    db: &DatabaseConnection,
    mut find: Select<project::Entity>,
    query: &ListQuery,
) -> Result<ApiResponse<Vec<AdminProjectView>>, AppError> {
    if let Some(term) = query.search_term() {
        find = find.filter(project::Column::Name.contains(term));
    }
    if let Some(status) = query.status.as_deref() {
        find = find.filter(project::Column::Status.eq(status));
    }

    let total = find.clone().count(db).await?;
    let projects = find
        .order_by_desc(project::Column::CreatedAt)
        .offset(query.offset())
        .limit(query.limit())
        .all(db)
        .await?;

    Ok(ApiResponse::paginated(
        "Projects retrieved successfully",
        with_owners(db, projects).await?,
        query.pagination(total),
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /api/admin/projects`: paginated, filterable by `search` (name) and `status`.
async fn list_projects(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<AdminProjectView>>, AppError> {
    paginate(&state.db, project::Entity::find(), &query).await
}

/// `GET /api/admin/projects/user/{user_id}`
async fn list_user_projects(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<AdminProjectView>>, AppError> {
    let find = project::Entity::find().filter(project::Column::UserId.eq(user_id));
    paginate(&state.db, find, &query).await
}

/// `GET /api/admin/projects/{id}`: the project, its owner and its tables.
async fn get_project(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<AdminProjectDetail>, AppError> {
    let project = find_project(&state.db, id).await?;
    let tables = project_table::Entity::find()
        .filter(project_table::Column::ProjectId.eq(id))
        .order_by_asc(project_table::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let view = with_owners(&state.db, vec![project])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    Ok(ApiResponse::ok(
        "Project retrieved successfully",
        AdminProjectDetail {
            project: view,
            tables,
        },
    ))
}

/// `PATCH /api/admin/projects/{id}/status`
async fn change_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ProjectStatusRequest>,
) -> Result<ApiResponse<project::Model>, AppError> {
    let status = ProjectStatus::from_str(&req.status)
        .ok_or_else(|| AppError::BadRequest("Invalid project status".to_string()))?;
    let project = find_project(&state.db, id).await?;

    let mut active: project::ActiveModel = project.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().fixed_offset());
    let project = active.update(&state.db).await?;

    Ok(ApiResponse::ok("Project status updated", project))
}

/// `DELETE /api/admin/projects/{id}`: removes the project and its tables.
async fn delete_project(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Option<()>>, AppError> {
    let project = find_project(&state.db, id).await?;

    let txn = state.db.begin().await?;
    project_table::Entity::delete_many()
        .filter(project_table::Column::ProjectId.eq(project.id))
        .exec(&txn)
        .await?;
    project::Entity::delete_by_id(project.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(project_id = %id, "Project deleted by admin");
    Ok(ApiResponse::ok("Project deleted successfully", None))
}
