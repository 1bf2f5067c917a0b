//! Read-only aggregates for the admin and customer dashboards.
//!
//! Month buckets are UTC calendar months rendered as `YYYY-MM` and are computed here
//! rather than with database date functions, so SQLite and Postgres agree.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::{DateTimeWithTimeZone, Expr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::status::{PaymentStatus, PurchaseStatus, Role};
use crate::entities::{package, payment, project, project_table, purchase, user};
use crate::services::purchase::{PurchaseSummary, purchase_history};

/// Number of months covered by the growth charts, current month included.
pub const CHART_MONTHS: u32 = 6;
pub const TOP_PACKAGES: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub totals: AdminTotals,
    pub charts: AdminCharts,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminTotals {
    pub total_users: u64,
    pub total_customers: u64,
    pub total_projects: u64,
    pub total_packages: u64,
    pub total_purchases: u64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCharts {
    pub purchase_status_stats: Vec<StatusCount>,
    pub monthly_revenue: Vec<MonthlyAmount>,
    pub top_selling_packages: Vec<TopPackage>,
    pub user_growth: Vec<MonthlyCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyAmount {
    pub month: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopPackage {
    pub package_id: Uuid,
    pub name: Option<String>,
    pub sales: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDashboard {
    pub active_purchases: Vec<PurchaseSummary>,
    pub totals: CustomerTotals,
    pub purchases: Vec<PurchaseSummary>,
    pub charts: CustomerCharts,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTotals {
    pub total_projects: u64,
    pub total_tables: u64,
    pub total_purchases: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCharts {
    pub project_chart: Vec<MonthlyCount>,
    pub table_stats: Vec<ProjectTableCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectTableCount {
    pub project_id: Uuid,
    pub name: String,
    pub tables: i64,
}

/// Build the admin dashboard.
///
/// # Errors
///
/// Returns a database error if any aggregate query fails.
pub async fn admin_dashboard(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<AdminDashboard, DbErr> {
    let total_users = user::Entity::find().count(db).await?;
    let total_customers = user::Entity::find()
        .filter(user::Column::Role.eq(Role::User.as_str()))
        .count(db)
        .await?;
    let total_projects = project::Entity::find().count(db).await?;
    let total_packages = package::Entity::find().count(db).await?;
    let total_purchases = purchase::Entity::find().count(db).await?;

    let purchase_status_stats: Vec<StatusCount> = purchase::Entity::find()
        .select_only()
        .column(purchase::Column::Status)
        .column_as(Expr::col(purchase::Column::Id).count(), "count")
        .group_by(purchase::Column::Status)
        .order_by_asc(purchase::Column::Status)
        .into_tuple::<(String, i64)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();

    let total_revenue = payment::Entity::find()
        .select_only()
        .column_as(Expr::col(payment::Column::Amount).sum(), "total")
        .filter(payment::Column::Status.eq(PaymentStatus::Completed.as_str()))
        .into_tuple::<Option<Decimal>>()
        .one(db)
        .await?
        .flatten()
        .unwrap_or(Decimal::ZERO)
        .round_dp(2);

    let window = window_start(now, CHART_MONTHS).fixed_offset();
    let recent_payments: Vec<(Decimal, DateTimeWithTimeZone)> = payment::Entity::find()
        .select_only()
        .column(payment::Column::Amount)
        .column(payment::Column::CreatedAt)
        .filter(payment::Column::Status.eq(PaymentStatus::Completed.as_str()))
        .filter(payment::Column::CreatedAt.gte(window))
        .into_tuple()
        .all(db)
        .await?;
    let monthly_revenue = revenue_by_month(&recent_payments, now, CHART_MONTHS);

    let sales: Vec<(Uuid, i64)> = purchase::Entity::find()
        .select_only()
        .column(purchase::Column::PackageId)
        .column_as(Expr::col(purchase::Column::Id).count(), "sales")
        .group_by(purchase::Column::PackageId)
        .into_tuple()
        .all(db)
        .await?;
    let top = top_sellers(sales, TOP_PACKAGES);
    let names: HashMap<Uuid, String> = package::Entity::find()
        .filter(package::Column::Id.is_in(top.iter().map(|(id, _)| *id)))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let top_selling_packages = top
        .into_iter()
        .map(|(package_id, sales)| TopPackage {
            package_id,
            name: names.get(&package_id).cloned(),
            sales,
        })
        .collect();

    let signups: Vec<DateTimeWithTimeZone> = user::Entity::find()
        .select_only()
        .column(user::Column::CreatedAt)
        .filter(user::Column::CreatedAt.gte(window))
        .into_tuple()
        .all(db)
        .await?;
    let user_growth = count_by_month(&signups, now, CHART_MONTHS);

    Ok(AdminDashboard {
        totals: AdminTotals {
            total_users,
            total_customers,
            total_projects,
            total_packages,
            total_purchases,
            total_revenue,
        },
        charts: AdminCharts {
            purchase_status_stats,
            monthly_revenue,
            top_selling_packages,
            user_growth,
        },
    })
}

/// Build a customer's own dashboard.
///
/// # Errors
///
/// Returns a database error if any aggregate query fails.
pub async fn customer_dashboard(
    db: &DatabaseConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CustomerDashboard, DbErr> {
    let purchases = purchase_history(db, user_id, now).await?;
    let active_purchases = purchases
        .iter()
        .filter(|p| p.status == PurchaseStatus::Active.as_str())
        .cloned()
        .collect();

    let projects = project::Entity::find()
        .filter(project::Column::UserId.eq(user_id))
        .order_by_asc(project::Column::CreatedAt)
        .all(db)
        .await?;

    let tables_per_project: HashMap<Uuid, i64> = project_table::Entity::find()
        .select_only()
        .column(project_table::Column::ProjectId)
        .column_as(Expr::col((project_table::Entity, project_table::Column::Id)).count(), "tables")
        .join(JoinType::InnerJoin, project_table::Relation::Project.def())
        .filter(project::Column::UserId.eq(user_id))
        .group_by(project_table::Column::ProjectId)
        .into_tuple::<(Uuid, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let total_tables = tables_per_project.values().copied().sum::<i64>();
    let created: Vec<DateTimeWithTimeZone> = projects.iter().map(|p| p.created_at).collect();
    let project_chart = count_by_month(&created, now, CHART_MONTHS);
    let table_stats = projects
        .iter()
        .map(|p| ProjectTableCount {
            project_id: p.id,
            name: p.name.clone(),
            tables: tables_per_project.get(&p.id).copied().unwrap_or(0),
        })
        .collect();

    Ok(CustomerDashboard {
        active_purchases,
        totals: CustomerTotals {
            total_projects: u64::try_from(projects.len()).unwrap_or(u64::MAX),
            total_tables: u64::try_from(total_tables).unwrap_or(0),
            total_purchases: u64::try_from(purchases.len()).unwrap_or(u64::MAX),
        },
        purchases,
        charts: CustomerCharts {
            project_chart,
            table_stats,
        },
    })
}

/// `YYYY-MM` of a timestamp, in UTC.
#[must_use]
pub fn month_key<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Utc).format("%Y-%m").to_string()
}

/// Keys of the last `months` calendar months ending with the month of `now`, ascending.
#[must_use]
pub fn recent_month_keys(now: DateTime<Utc>, months: u32) -> Vec<String> {
    let current = month_index(now);
    (0..i64::from(months))
        .rev()
        .map(|back| {
            let (year, month) = split_month_index(current - back);
            format!("{year:04}-{month:02}")
        })
        .collect()
}

/// First instant of the oldest month in the window.
fn window_start(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let (year, month) = split_month_index(month_index(now) - i64::from(months.saturating_sub(1)));
    i32::try_from(year)
        .ok()
        .and_then(|y| Utc.with_ymd_and_hms(y, month, 1, 0, 0, 0).single())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn month_index(at: DateTime<Utc>) -> i64 {
    i64::from(at.year()) * 12 + i64::from(at.month0())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn split_month_index(index: i64) -> (i64, u32) {
    (index.div_euclid(12), (index.rem_euclid(12) + 1) as u32)
}

/// Zero-filled counts for each month of the window.
fn count_by_month(
    stamps: &[DateTimeWithTimeZone],
    now: DateTime<Utc>,
    months: u32,
) -> Vec<MonthlyCount> {
    let mut buckets: BTreeMap<String, i64> = recent_month_keys(now, months)
        .into_iter()
        .map(|key| (key, 0))
        .collect();
    for stamp in stamps {
        if let Some(count) = buckets.get_mut(&month_key(stamp)) {
            *count += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect()
}

/// Zero-filled revenue for each month of the window.
fn revenue_by_month(
    payments: &[(Decimal, DateTimeWithTimeZone)],
    now: DateTime<Utc>,
    months: u32,
) -> Vec<MonthlyAmount> {
    let mut buckets: BTreeMap<String, Decimal> = recent_month_keys(now, months)
        .into_iter()
        .map(|key| (key, Decimal::ZERO))
        .collect();
    for (amount, at) in payments {
        if let Some(total) = buckets.get_mut(&month_key(at)) {
            *total += *amount;
        }
    }
    buckets
        .into_iter()
        .map(|(month, total)| MonthlyAmount {
            month,
            total: total.round_dp(2),
        })
        .collect()
}

/// Highest sales first; ties go to the smaller package id.
fn top_sellers(mut sales: Vec<(Uuid, i64)>, limit: usize) -> Vec<(Uuid, i64)> {
    sales.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sales.truncate(limit);
    sales
}
