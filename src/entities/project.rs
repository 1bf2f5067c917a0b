use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_plan_id: Uuid,
    pub purchase_id: Option<Uuid>,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(unique)]
    pub db_name: String,
    pub status: String,
    pub total_table_limit: i32,
    pub total_created_table: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    #[must_use]
    pub const fn has_table_quota(&self) -> bool {
        self.total_created_table < self.total_table_limit
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
        belongs_to = "super::package_plan::Entity",
        from = "Column::PackagePlanId",
        to = "super::package_plan::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    PackagePlan,
    #[sea_orm(
        belongs_to = "super::purchase::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Purchase,
    #[sea_orm(has_many = "super::project_table::Entity")]
    ProjectTable,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::package_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackagePlan.def()
    }
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl Related<super::project_table::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectTable.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
