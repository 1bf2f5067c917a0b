//! Typed loaders and counter updates shared by the workflows and route handlers.
//!
//! Everything here is generic over [`ConnectionTrait`] so it runs equally against the
//! pool or inside an open transaction.

use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::status::{PlanStatus, PurchaseStatus};
use crate::entities::{package, package_plan, project, project_table, purchase, user};

/// Load a plan together with the package it belongs to.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_plan_with_package<C: ConnectionTrait>(
    conn: &C,
    plan_id: Uuid,
) -> Result<Option<(package_plan::Model, package::Model)>, DbErr> {
    let row = package_plan::Entity::find_by_id(plan_id)
        .find_also_related(package::Entity)
        .one(conn)
        .await?;
    Ok(row.and_then(|(plan, package)| package.map(|package| (plan, package))))
}

/// Load a project owned by `user_id` together with its plan.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_project_with_plan<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<(project::Model, package_plan::Model)>, DbErr> {
    let row = project::Entity::find_by_id(project_id)
        .filter(project::Column::UserId.eq(user_id))
        .find_also_related(package_plan::Entity)
        .one(conn)
        .await?;
    Ok(row.and_then(|(project, plan)| plan.map(|plan| (project, plan))))
}

/// Like [`find_project_with_plan`] but only when the plan is still active.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_project_with_active_plan<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<(project::Model, package_plan::Model)>, DbErr> {
    Ok(find_project_with_plan(conn, project_id, user_id)
        .await?
        .filter(|(_, plan)| plan.is_active()))
}

/// Load a project by id, scoped to its owner.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_owned_project<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<project::Model>, DbErr> {
    project::Entity::find_by_id(project_id)
        .filter(project::Column::UserId.eq(user_id))
        .one(conn)
        .await
}

/// Load a table with its project, scoped to the project's owner.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_owned_table<C: ConnectionTrait>(
    conn: &C,
    table_id: Uuid,
    user_id: Uuid,
) -> Result<Option<(project_table::Model, project::Model)>, DbErr> {
    let row = project_table::Entity::find_by_id(table_id)
        .find_also_related(project::Entity)
        .filter(project::Column::UserId.eq(user_id))
        .one(conn)
        .await?;
    Ok(row.and_then(|(table, project)| project.map(|project| (table, project))))
}

/// All of a user's effectively active purchases of a plan, earliest end date first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn active_purchases_for_plan<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    plan_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<purchase::Model>, DbErr> {
    purchase::Entity::find()
        .filter(purchase::Column::UserId.eq(user_id))
        .filter(purchase::Column::PackagePlanId.eq(plan_id))
        .filter(purchase::Column::Status.eq(PurchaseStatus::Active.as_str()))
        .filter(purchase::Column::EndDate.gt(now.fixed_offset()))
        .order_by_asc(purchase::Column::EndDate)
        .order_by_asc(purchase::Column::Id)
        .all(conn)
        .await
}

/// The earliest-ending effectively active purchase of a plan, if any.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_active_purchase<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    plan_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<purchase::Model>, DbErr> {
    Ok(active_purchases_for_plan(conn, user_id, plan_id, now)
        .await?
        .into_iter()
        .next())
}

/// Active plans of a package, optionally leaving out the plans being edited.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn active_plans_of_package<C: ConnectionTrait>(
    conn: &C,
    package_id: Uuid,
    exclude: &[Uuid],
) -> Result<Vec<package_plan::Model>, DbErr> {
    let mut query = package_plan::Entity::find()
        .filter(package_plan::Column::PackageId.eq(package_id))
        .filter(package_plan::Column::Status.eq(PlanStatus::Active.as_str()));
    if !exclude.is_empty() {
        query = query.filter(package_plan::Column::Id.is_not_in(exclude.iter().copied()));
    }
    query
        .order_by_asc(package_plan::Column::DurationDays)
        .all(conn)
        .await
}

/// Look up the user holding an API token digest.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_user_by_token_hash<C: ConnectionTrait>(
    conn: &C,
    token_hash: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::ApiTokenHash.eq(token_hash))
        .one(conn)
        .await
}

/// Bump `total_created_project` by one unless the purchase is already at its limit.
///
/// Returns `false` when no row was updated, meaning the quota is exhausted.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn increment_purchase_projects<C: ConnectionTrait>(
    conn: &C,
    purchase_id: Uuid,
) -> Result<bool, DbErr> {
    let result = purchase::Entity::update_many()
        .col_expr(
            purchase::Column::TotalCreatedProject,
            Expr::col(purchase::Column::TotalCreatedProject).add(1),
        )
        .col_expr(
            purchase::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        )
        .filter(purchase::Column::Id.eq(purchase_id))
        .filter(
            Expr::col(purchase::Column::TotalCreatedProject)
                .lt(Expr::col(purchase::Column::TotalProjectLimit)),
        )
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Bump `total_created_table` by one unless the project is already at its limit.
///
/// Returns `false` when no row was updated, meaning the quota is exhausted.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn increment_project_tables<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> Result<bool, DbErr> {
    let result = project::Entity::update_many()
        .col_expr(
            project::Column::TotalCreatedTable,
            Expr::col(project::Column::TotalCreatedTable).add(1),
        )
        .col_expr(
            project::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        )
        .filter(project::Column::Id.eq(project_id))
        .filter(
            Expr::col(project::Column::TotalCreatedTable)
                .lt(Expr::col(project::Column::TotalTableLimit)),
        )
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Add one to a package's `sell_count`.
///
/// # Errors
///
/// Returns a database error if the update fails or the package does not exist.
pub async fn increment_sell_count<C: ConnectionTrait>(
    conn: &C,
    package_id: Uuid,
) -> Result<(), DbErr> {
    let result = package::Entity::update_many()
        .col_expr(
            package::Column::SellCount,
            Expr::col(package::Column::SellCount).add(1),
        )
        .filter(package::Column::Id.eq(package_id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(DbErr::RecordNotUpdated);
    }
    Ok(())
}
