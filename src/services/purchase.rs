use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::db::queries;
use crate::entities::status::{PackageStatus, PaymentStatus, PurchaseStatus};
use crate::entities::{package, package_plan, payment, purchase};
use crate::error::AppError;

pub const PLAN_NOT_FOUND: &str = "Package plan not found";
pub const PLAN_UNAVAILABLE: &str = "This package plan is not available";
pub const PURCHASE_FAILED: &str = "Failed to purchase package";

/// Result of a successful purchase.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub purchase: purchase::Model,
    pub package: package::Model,
    pub plan: package_plan::Model,
}

/// Buy a plan for a customer.
///
/// The purchase row, the package's `sell_count` bump and the completed payment record
/// are written in one transaction. The purchase copies the package's project cap as
/// its own quota.
///
/// # Errors
///
/// - [`AppError::NotFound`] when the plan does not exist.
/// - [`AppError::BadRequest`] when the plan or its package is not active.
/// - [`AppError::Failed`] when any write fails; nothing is persisted in that case.
pub async fn purchase_plan(
    db: &DatabaseConnection,
    user_id: Uuid,
    plan_id: Uuid,
) -> Result<PurchaseReceipt, AppError> {
    let (plan, package) = queries::find_plan_with_package(db, plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(PLAN_NOT_FOUND.to_string()))?;

    if !plan.is_active()
        || PackageStatus::from_str(&package.status) != Some(PackageStatus::Active)
    {
        return Err(AppError::BadRequest(PLAN_UNAVAILABLE.to_string()));
    }

    let purchase = record_purchase(db, user_id, &plan, &package)
        .await
        .map_err(|e| AppError::failed(PURCHASE_FAILED, e))?;

    tracing::info!(
        purchase_id = %purchase.id,
        user_id = %user_id,
        package_plan_id = %plan.id,
        amount_paid = %purchase.amount_paid,
        "Package purchased"
    );

    Ok(PurchaseReceipt {
        purchase,
        package,
        plan,
    })
}

async fn record_purchase(
    db: &DatabaseConnection,
    user_id: Uuid,
    plan: &package_plan::Model,
    package: &package::Model,
) -> Result<purchase::Model, DbErr> {
    let now = Utc::now();
    let end = now + Duration::days(i64::from(plan.duration_days));

    let txn = db.begin().await?;

    let purchase = purchase::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        package_id: Set(package.id),
        package_plan_id: Set(plan.id),
        start_date: Set(now.fixed_offset()),
        end_date: Set(end.fixed_offset()),
        amount_paid: Set(plan.final_price),
        status: Set(PurchaseStatus::Active.as_str().to_string()),
        total_project_limit: Set(package.max_projects),
        total_created_project: Set(0),
        created_at: Set(now.fixed_offset()),
        updated_at: Set(now.fixed_offset()),
    }
    .insert(&txn)
    .await?;

    queries::increment_sell_count(&txn, package.id).await?;

    payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        package_id: Set(package.id),
        purchase_id: Set(Some(purchase.id)),
        amount: Set(plan.final_price),
        transaction_id: Set(Some(format!("txn_{}", purchase.id.simple()))),
        status: Set(PaymentStatus::Completed.as_str().to_string()),
        payment_method: Set(None),
        created_at: Set(now.fixed_offset()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(purchase)
}

/// A purchase as shown to its owner: package and plan names, effective status and days left.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseSummary {
    pub id: Uuid,
    pub package_id: Uuid,
    pub package_name: Option<String>,
    pub package_plan_id: Uuid,
    pub plan_type: Option<String>,
    pub duration_days: Option<i32>,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    pub amount_paid: Decimal,
    pub status: String,
    pub remaining_days: i64,
    pub total_project_limit: i32,
    pub total_created_project: i32,
    pub created_at: DateTimeWithTimeZone,
}

/// Every purchase of a user, newest first.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn purchase_history(
    db: &DatabaseConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<PurchaseSummary>, DbErr> {
    let rows = purchase::Entity::find()
        .filter(purchase::Column::UserId.eq(user_id))
        .order_by_desc(purchase::Column::CreatedAt)
        .find_also_related(package::Entity)
        .all(db)
        .await?;

    let plan_ids: Vec<Uuid> = rows.iter().map(|(p, _)| p.package_plan_id).collect();
    let plans: HashMap<Uuid, package_plan::Model> = package_plan::Entity::find()
        .filter(package_plan::Column::Id.is_in(plan_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|plan| (plan.id, plan))
        .collect();

    Ok(rows
        .into_iter()
        .map(|(purchase, package)| {
            let plan = plans.get(&purchase.package_plan_id);
            summarize(&purchase, package.as_ref(), plan, now)
        })
        .collect())
}

fn summarize(
    purchase: &purchase::Model,
    package: Option<&package::Model>,
    plan: Option<&package_plan::Model>,
    now: DateTime<Utc>,
) -> PurchaseSummary {
    PurchaseSummary {
        id: purchase.id,
        package_id: purchase.package_id,
        package_name: package.map(|p| p.name.clone()),
        package_plan_id: purchase.package_plan_id,
        plan_type: plan.map(|p| p.plan_type.clone()),
        duration_days: plan.map(|p| p.duration_days),
        start_date: purchase.start_date,
        end_date: purchase.end_date,
        amount_paid: purchase.amount_paid,
        status: purchase.effective_status(now).to_string(),
        remaining_days: purchase.remaining_days(now),
        total_project_limit: purchase.total_project_limit,
        total_created_project: purchase.total_created_project,
        created_at: purchase.created_at,
    }
}
