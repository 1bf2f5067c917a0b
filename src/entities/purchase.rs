use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::status::PurchaseStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub package_plan_id: Uuid,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub amount_paid: Decimal,
    pub status: String,
    pub total_project_limit: i32,
    pub total_created_project: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// `active` status and an end date still in the future.
    #[must_use]
    pub fn is_effectively_active(&self, now: DateTime<Utc>) -> bool {
        PurchaseStatus::from_str(&self.status) == Some(PurchaseStatus::Active) && self.end_date > now
    }

    /// Status as seen by the customer: an `active` row past its end date reads as `expired`.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> &str {
        if PurchaseStatus::from_str(&self.status) == Some(PurchaseStatus::Active) && self.end_date <= now {
            PurchaseStatus::Expired.as_str()
        } else {
            &self.status
        }
    }

    /// Whole days left, rounded up; zero once expired.
    #[must_use]
    pub fn remaining_days(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.end_date.with_timezone(&Utc) - now).num_seconds();
        if secs <= 0 {
            return 0;
        }
        (secs + 86_399) / 86_400
    }

    #[must_use]
    pub const fn has_project_quota(&self) -> bool {
        self.total_created_project < self.total_project_limit
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::package::Entity",
        from = "Column::PackageId",
        to = "super::package::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Package,
    #[sea_orm(
        belongs_to = "super::package_plan::Entity",
        from = "Column::PackagePlanId",
        to = "super::package_plan::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    PackagePlan,
    #[sea_orm(has_many = "super::project::Entity")]
    Project,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl Related<super::package_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackagePlan.def()
    }
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
