use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::CustomerUser;
use crate::db::queries;
use crate::entities::status::ProjectStatus;
use crate::entities::{project, project_table};
use crate::error::AppError;
use crate::response::{ApiResponse, ListQuery};
use crate::services::provisioning::{self, NewProject};
use crate::state::AppState;
use crate::validation::ValidatedJson;

const PROJECT_NOT_FOUND: &str = "Project not found";

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the customer project route group: `/customer/projects/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/customer/projects",
            get(list_projects).post(create_project),
        )
        .route(
            "/customer/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/customer/projects/{id}/status", patch(change_status))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    pub package_plan_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Project name is required"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Project name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProjectStatusRequest {
    #[validate(custom(function = "crate::validation::rules::project_status"))]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectWithTables {
    #[serde(flatten)]
    pub project: project::Model,
    pub tables: Vec<project_table::Model>,
}

async fn owned_project(
    db: &DatabaseConnection,
    id: Uuid,
    user_id: Uuid,
) -> Result<project::Model, AppError> {
    queries::find_owned_project(db, id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(PROJECT_NOT_FOUND.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/customer/projects`: charges one project against an active purchase of the plan.
async fn create_project(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> Result<ApiResponse<project::Model>, AppError> {
    let project = provisioning::create_project(
        &state.db,
        user.id,
        NewProject {
            package_plan_id: req.package_plan_id,
            name: req.name.trim().to_string(),
            description: req.description,
        },
    )
    .await?;

    Ok(ApiResponse::created("Project created successfully", project))
}

/// `GET /api/customer/projects`: the caller's projects, filterable by `search` and `status`.
async fn list_projects(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<project::Model>>, AppError> {
    let mut find = project::Entity::find().filter(project::Column::UserId.eq(user.id));
    if let Some(term) = query.search_term() {
        find = find.filter(project::Column::Name.contains(term));
    }
    if let Some(status) = query.status.as_deref() {
        find = find.filter(project::Column::Status.eq(status));
    }

    let total = find.clone().count(&state.db).await?;
    let projects = find
        .order_by_desc(project::Column::CreatedAt)
        .offset(query.offset())
        .limit(query.limit())
        .all(&state.db)
        .await?;

    Ok(ApiResponse::paginated(
        "Projects fetched successfully",
        projects,
        query.pagination(total),
    ))
}

/// `GET /api/customer/projects/{id}`
async fn get_project(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<ProjectWithTables>, AppError> {
    let project = owned_project(&state.db, id, user.id).await?;
    let tables = project_table::Entity::find()
        .filter(project_table::Column::ProjectId.eq(project.id))
        .order_by_asc(project_table::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(ApiResponse::ok(
        "Project fetched successfully",
        ProjectWithTables { project, tables },
    ))
}

/// `PUT /api/customer/projects/{id}`: name and description only.
async fn update_project(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> Result<ApiResponse<project::Model>, AppError> {
    let project = owned_project(&state.db, id, user.id).await?;

    let mut active: project::ActiveModel = project.into();
    if let Some(name) = req.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = req.description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    let project = active.update(&state.db).await?;

    Ok(ApiResponse::ok("Project updated successfully", project))
}

/// `PATCH /api/customer/projects/{id}/status`
async fn change_status(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ProjectStatusRequest>,
) -> Result<ApiResponse<project::Model>, AppError> {
    let status = ProjectStatus::from_str(&req.status)
        .ok_or_else(|| AppError::BadRequest("Invalid project status".to_string()))?;
    let project = owned_project(&state.db, id, user.id).await?;

    let mut active: project::ActiveModel = project.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().fixed_offset());
    let project = active.update(&state.db).await?;

    Ok(ApiResponse::ok("Project status updated", project))
}

/// `DELETE /api/customer/projects/{id}`
///
/// The purchase's project counter is left alone: the quota counts creations.
async fn delete_project(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Option<()>>, AppError> {
    let project = owned_project(&state.db, id, user.id).await?;

    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| AppError::failed("Failed to delete project", e))?;
    project_table::Entity::delete_many()
        .filter(project_table::Column::ProjectId.eq(project.id))
        .exec(&txn)
        .await
        .map_err(|e| AppError::failed("Failed to delete project", e))?;
    project::Entity::delete_by_id(project.id)
        .exec(&txn)
        .await
        .map_err(|e| AppError::failed("Failed to delete project", e))?;
    txn.commit()
        .await
        .map_err(|e| AppError::failed("Failed to delete project", e))?;

    tracing::info!(project_id = %id, db_name = %project.db_name, "Project deleted");
    Ok(ApiResponse::ok("Project deleted successfully", None))
}
