use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::status::{DiscountType, PlanStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "package_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub package_id: Uuid,
    pub plan_type: String,
    pub duration_days: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub discount_type: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub discount_value: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub final_price: Decimal,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    #[must_use]
    pub fn is_active(&self) -> bool {
        PlanStatus::from_str(&self.status) == Some(PlanStatus::Active)
    }

    #[must_use]
    pub fn discount_kind(&self) -> Option<DiscountType> {
        self.discount_type.as_deref().and_then(DiscountType::from_str)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::package::Entity",
        from = "Column::PackageId",
        to = "super::package::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Package,
    #[sea_orm(has_many = "super::purchase::Entity")]
    Purchase,
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
