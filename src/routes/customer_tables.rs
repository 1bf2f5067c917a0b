use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::CustomerUser;
use crate::db::queries;
use crate::entities::status::PlanStatus;
use crate::entities::{package_plan, project, project_table};
use crate::error::AppError;
use crate::response::{ApiResponse, ListQuery};
use crate::services::provisioning::{self, NewTable, PROJECT_NOT_FOUND_OR_INACTIVE};
use crate::state::AppState;
use crate::validation::ValidatedJson;

const TABLE_NOT_FOUND: &str = "Project table not found";
const TABLE_NOT_FOUND_OR_INACTIVE: &str = "Project table not found or package plan is inactive";

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the customer table route group: `/customer/project-table/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/customer/project-table",
            get(list_all_tables).post(create_table),
        )
        .route(
            "/customer/project-table/{id}",
            get(get_table).put(update_table).delete(delete_table),
        )
        .route(
            "/customer/project-table/all/{project_id}",
            get(list_project_tables),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTableRequest {
    pub project_id: Uuid,
    #[validate(
        length(min = 1, max = 64, message = "Table name must be 1-64 characters"),
        custom(function = "crate::validation::rules::identifier")
    )]
    pub table_name: String,
    #[validate(custom(function = "crate::validation::rules::json_document"))]
    pub schema_json: Value,
    pub api_endpoints: Option<Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTableRequest {
    #[validate(
        length(min = 1, max = 64, message = "Table name must be 1-64 characters"),
        custom(function = "crate::validation::rules::identifier")
    )]
    pub table_name: Option<String>,
    #[validate(custom(function = "crate::validation::rules::json_document"))]
    pub schema_json: Option<Value>,
    pub api_endpoints: Option<Value>,
}

/// The owning project as shown next to a table.
#[derive(Debug, Serialize)]
pub struct ProjectRef {
    pub id: Uuid,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct TableView {
    #[serde(flatten)]
    pub table: project_table::Model,
    pub project: Option<ProjectRef>,
}

impl TableView {
    fn new(table: project_table::Model, project: Option<&project::Model>) -> Self {
        Self {
            table,
            project: project.map(|p| ProjectRef {
                id: p.id,
                name: p.name.clone(),
                status: p.status.clone(),
            }),
        }
    }
}

/// Load a table owned by `user_id` whose project's plan is still active.
async fn active_owned_table(
    state: &AppState,
    id: Uuid,
    user_id: Uuid,
) -> Result<(project_table::Model, project::Model), AppError> {
    let (table, project) = queries::find_owned_table(&state.db, id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(TABLE_NOT_FOUND_OR_INACTIVE.to_string()))?;

    let plan_active = package_plan::Entity::find_by_id(project.package_plan_id)
        .one(&state.db)
        .await?
        .is_some_and(|plan| plan.is_active());
    if !plan_active {
        return Err(AppError::NotFound(TABLE_NOT_FOUND_OR_INACTIVE.to_string()));
    }
    Ok((table, project))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/customer/project-table`: charges one table against the project's quota.
async fn create_table(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    ValidatedJson(req): ValidatedJson<CreateTableRequest>,
) -> Result<ApiResponse<project_table::Model>, AppError> {
    let table = provisioning::create_table(
        &state.db,
        user.id,
        NewTable {
            project_id: req.project_id,
            table_name: req.table_name,
            schema_json: req.schema_json,
            api_endpoints: req.api_endpoints,
        },
    )
    .await?;

    Ok(ApiResponse::created("Project table created successfully", table))
}

/// `GET /api/customer/project-table`: every table of the caller's projects on active plans.
///
/// Accepts `search` (table name) and an optional `project_id`.
async fn list_all_tables(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<TableView>>, AppError> {
    let mut find = project_table::Entity::find()
        .find_also_related(project::Entity)
        .join(JoinType::InnerJoin, project::Relation::PackagePlan.def())
        .filter(project::Column::UserId.eq(user.id))
        .filter(package_plan::Column::Status.eq(PlanStatus::Active.as_str()));
    if let Some(term) = query.search_term() {
        find = find.filter(project_table::Column::TableName.contains(term));
    }
    if let Some(project_id) = query.project_id {
        find = find.filter(project_table::Column::ProjectId.eq(project_id));
    }

    let total = find.clone().count(&state.db).await?;
    let rows = find
        .order_by_desc(project_table::Column::CreatedAt)
        .offset(query.offset())
        .limit(query.limit())
        .all(&state.db)
        .await?;

    let tables = rows
        .into_iter()
        .map(|(table, project)| TableView::new(table, project.as_ref()))
        .collect();
    Ok(ApiResponse::paginated(
        "Project tables fetched successfully",
        tables,
        query.pagination(total),
    ))
}

/// `GET /api/customer/project-table/all/{project_id}`
async fn list_project_tables(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<TableView>>, AppError> {
    let (project, _plan) = queries::find_project_with_active_plan(&state.db, project_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(PROJECT_NOT_FOUND_OR_INACTIVE.to_string()))?;

    let mut find =
        project_table::Entity::find().filter(project_table::Column::ProjectId.eq(project.id));
    if let Some(term) = query.search_term() {
        find = find.filter(project_table::Column::TableName.contains(term));
    }

    let total = find.clone().count(&state.db).await?;
    let tables = find
        .order_by_desc(project_table::Column::CreatedAt)
        .offset(query.offset())
        .limit(query.limit())
        .all(&state.db)
        .await?
        .into_iter()
        .map(|table| TableView::new(table, Some(&project)))
        .collect();

    Ok(ApiResponse::paginated(
        "Project tables fetched successfully",
        tables,
        query.pagination(total),
    ))
}

/// `GET /api/customer/project-table/{id}`
async fn get_table(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<TableView>, AppError> {
    let (table, project) = active_owned_table(&state, id, user.id).await?;
    Ok(ApiResponse::ok(
        "Project table fetched successfully",
        TableView::new(table, Some(&project)),
    ))
}

/// `PUT /api/customer/project-table/{id}`
async fn update_table(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTableRequest>,
) -> Result<ApiResponse<project_table::Model>, AppError> {
    let (table, _project) = active_owned_table(&state, id, user.id).await?;

    let mut active: project_table::ActiveModel = table.into();
    if let Some(table_name) = req.table_name {
        active.table_name = Set(table_name);
    }
    if let Some(schema_json) = req.schema_json {
        active.schema_json = Set(schema_json);
    }
    if let Some(api_endpoints) = req.api_endpoints {
        active.api_endpoints = Set(Some(api_endpoints));
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    let table = active.update(&state.db).await?;

    Ok(ApiResponse::ok("Project table updated successfully", table))
}

/// `DELETE /api/customer/project-table/{id}`: ownership only, the plan may be inactive.
async fn delete_table(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Option<()>>, AppError> {
    let (table, _project) = queries::find_owned_table(&state.db, id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(TABLE_NOT_FOUND.to_string()))?;

    project_table::Entity::delete_by_id(table.id)
        .exec(&state.db)
        .await
        .map_err(|e| AppError::failed("Failed to delete project table", e))?;

    tracing::info!(table_id = %id, "Project table deleted");
    Ok(ApiResponse::ok("Project table deleted successfully", None))
}
