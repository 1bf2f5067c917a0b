//! Quota-bounded creation of projects and project tables.
//!
//! Both workflows insert first and then bump the owning counter with a conditional
//! UPDATE. If that UPDATE touches no row the limit was hit concurrently and the
//! transaction is dropped, which rolls the insert back.

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, DatabaseConnection, TransactionTrait};
use serde_json::Value;
use uuid::Uuid;

use crate::db::queries;
use crate::entities::status::ProjectStatus;
use crate::entities::{project, project_table};
use crate::error::AppError;

pub const NO_ACTIVE_PACKAGE: &str = "No active package found. Please purchase a package first.";
pub const PROJECT_LIMIT_REACHED: &str = "Project limit reached for this package";
pub const PROJECT_NOT_FOUND_OR_INACTIVE: &str = "Project not found or package plan is inactive";
pub const NO_ACTIVE_PURCHASE: &str = "No active purchase found for this package plan";
pub const TABLE_LIMIT_REACHED: &str = "Table limit reached for this package";

const PROJECT_CREATE_FAILED: &str = "Failed to create project";
const TABLE_CREATE_FAILED: &str = "Failed to create project table";

#[derive(Debug, Clone)]
pub struct NewProject {
    pub package_plan_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTable {
    pub project_id: Uuid,
    pub table_name: String,
    pub schema_json: Value,
    pub api_endpoints: Option<Value>,
}

/// Create a project against the caller's active purchase of a plan.
///
/// With several active purchases of the same plan, the earliest-ending one that still
/// has room is charged.
///
/// # Errors
///
/// - [`AppError::Forbidden`] without an active purchase, or when the project quota is spent.
/// - [`AppError::NotFound`] when the purchased plan has disappeared.
/// - [`AppError::Failed`] when a write fails.
pub async fn create_project(
    db: &DatabaseConnection,
    user_id: Uuid,
    input: NewProject,
) -> Result<project::Model, AppError> {
    let now = Utc::now();
    let txn = db
        .begin()
        .await
        .map_err(|e| AppError::failed(PROJECT_CREATE_FAILED, e))?;

    let purchases =
        queries::active_purchases_for_plan(&txn, user_id, input.package_plan_id, now).await?;
    if purchases.is_empty() {
        return Err(AppError::Forbidden(NO_ACTIVE_PACKAGE.to_string()));
    }
    let purchase = purchases
        .into_iter()
        .find(|p| p.has_project_quota())
        .ok_or_else(|| AppError::Forbidden(PROJECT_LIMIT_REACHED.to_string()))?;

    let (plan, package) = queries::find_plan_with_package(&txn, purchase.package_plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(super::purchase::PLAN_NOT_FOUND.to_string()))?;

    let project = project::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        package_plan_id: Set(plan.id),
        purchase_id: Set(Some(purchase.id)),
        name: Set(input.name),
        description: Set(input.description),
        db_name: Set(generate_db_name(user_id, now)),
        status: Set(ProjectStatus::Active.as_str().to_string()),
        total_table_limit: Set(package.max_tables_per_project),
        total_created_table: Set(0),
        created_at: Set(now.fixed_offset()),
        updated_at: Set(now.fixed_offset()),
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::failed(PROJECT_CREATE_FAILED, e))?;

    if !queries::increment_purchase_projects(&txn, purchase.id)
        .await
        .map_err(|e| AppError::failed(PROJECT_CREATE_FAILED, e))?
    {
        tracing::warn!(purchase_id = %purchase.id, "Project quota exhausted concurrently");
        return Err(AppError::Forbidden(PROJECT_LIMIT_REACHED.to_string()));
    }

    txn.commit()
        .await
        .map_err(|e| AppError::failed(PROJECT_CREATE_FAILED, e))?;

    tracing::info!(
        project_id = %project.id,
        purchase_id = %purchase.id,
        db_name = %project.db_name,
        "Project created"
    );
    Ok(project)
}

/// Create a table inside one of the caller's projects.
///
/// # Errors
///
/// - [`AppError::NotFound`] when the project is missing, not owned, or its plan is inactive.
/// - [`AppError::Forbidden`] without an active purchase of the plan, or when the table quota is spent.
/// - [`AppError::Failed`] when a write fails; the table row is rolled back with it.
pub async fn create_table(
    db: &DatabaseConnection,
    user_id: Uuid,
    input: NewTable,
) -> Result<project_table::Model, AppError> {
    let now = Utc::now();
    let txn = db
        .begin()
        .await
        .map_err(|e| AppError::failed(TABLE_CREATE_FAILED, e))?;

    let (project, plan) = queries::find_project_with_active_plan(&txn, input.project_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(PROJECT_NOT_FOUND_OR_INACTIVE.to_string()))?;

    if queries::find_active_purchase(&txn, user_id, plan.id, now)
        .await?
        .is_none()
    {
        return Err(AppError::Forbidden(NO_ACTIVE_PURCHASE.to_string()));
    }

    if !project.has_table_quota() {
        return Err(AppError::Forbidden(TABLE_LIMIT_REACHED.to_string()));
    }

    let table = project_table::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project.id),
        table_name: Set(input.table_name),
        schema_json: Set(input.schema_json),
        api_endpoints: Set(input.api_endpoints),
        created_at: Set(now.fixed_offset()),
        updated_at: Set(now.fixed_offset()),
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::failed(TABLE_CREATE_FAILED, e))?;

    if !queries::increment_project_tables(&txn, project.id)
        .await
        .map_err(|e| AppError::failed(TABLE_CREATE_FAILED, e))?
    {
        tracing::warn!(project_id = %project.id, "Table quota exhausted concurrently");
        return Err(AppError::Forbidden(TABLE_LIMIT_REACHED.to_string()));
    }

    txn.commit()
        .await
        .map_err(|e| AppError::failed(TABLE_CREATE_FAILED, e))?;

    tracing::info!(
        project_id = %project.id,
        table_id = %table.id,
        table_name = %table.table_name,
        "Project table created"
    );
    Ok(table)
}

/// Build the placeholder database name recorded for a new project:
/// `proj_<first 8 hex of the owner id>_<unix millis>_<4 random digits>`.
fn generate_db_name(user_id: Uuid, now: DateTime<Utc>) -> String {
    let owner = user_id.simple().to_string();
    let prefix = owner.get(..8).unwrap_or(&owner);
    let suffix = rand::random::<u16>() % 10_000;
    format!("proj_{prefix}_{}_{suffix:04}", now.timestamp_millis())
}
