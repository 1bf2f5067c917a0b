use sea_orm_migration::prelude::*;

/// Creates the `project_tables` table: logical tables defined inside a project.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ProjectTables {
    Table,
    Id,
    ProjectId,
    TableName,
    SchemaJson,
    ApiEndpoints,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectTables::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectTables::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectTables::ProjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(ProjectTables::TableName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProjectTables::SchemaJson).json().not_null())
                    .col(ColumnDef::new(ProjectTables::ApiEndpoints).json().null())
                    .col(
                        ColumnDef::new(ProjectTables::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProjectTables::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_tables_project_id")
                            .from(ProjectTables::Table, ProjectTables::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_project_tables_project_id")
                    .table(ProjectTables::Table)
                    .col(ProjectTables::ProjectId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectTables::Table).to_owned())
            .await
    }
}
