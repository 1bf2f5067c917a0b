use sea_orm_migration::prelude::*;

/// Creates the `token_logs` table: an audit trail of API token issue/revoke events.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum TokenLogs {
    Table,
    Id,
    UserId,
    ApiTokenHash,
    Action,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TokenLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TokenLogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(TokenLogs::UserId).uuid().not_null())
                    .col(ColumnDef::new(TokenLogs::ApiTokenHash).string_len(128).null())
                    .col(ColumnDef::new(TokenLogs::Action).string_len(20).not_null())
                    .col(
                        ColumnDef::new(TokenLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_token_logs_user_id")
                            .from(TokenLogs::Table, TokenLogs::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TokenLogs::Table).to_owned())
            .await
    }
}
