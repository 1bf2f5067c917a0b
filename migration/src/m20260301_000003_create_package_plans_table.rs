use sea_orm_migration::prelude::*;

/// Creates the `package_plans` table: billing cadences with their derived final price.
///
/// Uniqueness of active `(package_id, plan_type, duration_days)` is enforced by the
/// application, not by an index, because inactive duplicates are allowed.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum PackagePlans {
    Table,
    Id,
    PackageId,
    PlanType,
    DurationDays,
    Price,
    DiscountType,
    DiscountValue,
    FinalPrice,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Packages {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PackagePlans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PackagePlans::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PackagePlans::PackageId).uuid().not_null())
                    .col(
                        ColumnDef::new(PackagePlans::PlanType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackagePlans::DurationDays)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackagePlans::Price)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackagePlans::DiscountType)
                            .string_len(20)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PackagePlans::DiscountValue)
                            .decimal_len(10, 2)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PackagePlans::FinalPrice)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackagePlans::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(PackagePlans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackagePlans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_package_plans_package_id")
                            .from(PackagePlans::Table, PackagePlans::PackageId)
                            .to(Packages::Table, Packages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_package_plans_package_id")
                    .table(PackagePlans::Table)
                    .col(PackagePlans::PackageId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PackagePlans::Table).to_owned())
            .await
    }
}
