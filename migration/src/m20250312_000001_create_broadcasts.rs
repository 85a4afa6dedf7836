use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ==================== 群发任务表 ====================
        manager
            .create_table(
                Table::create()
                    .table(Broadcasts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Broadcasts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Broadcasts::Message).text().not_null())
                    .col(ColumnDef::new(Broadcasts::Status).string().not_null())
                    .col(ColumnDef::new(Broadcasts::Total).integer().not_null())
                    .col(
                        ColumnDef::new(Broadcasts::Sent)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Broadcasts::Failed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Broadcasts::CreatedBy).big_integer().not_null())
                    .col(
                        ColumnDef::new(Broadcasts::MinDelayMs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Broadcasts::MaxDelayMs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Broadcasts::FinishedAt).big_integer().null())
                    .col(ColumnDef::new(Broadcasts::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Broadcasts::UpdatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Broadcasts::Table, Broadcasts::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 群发接收人表 ====================
        manager
            .create_table(
                Table::create()
                    .table(BroadcastRecipients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BroadcastRecipients::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BroadcastRecipients::BroadcastId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BroadcastRecipients::StudentId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(BroadcastRecipients::Name).string().null())
                    .col(
                        ColumnDef::new(BroadcastRecipients::Phone)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BroadcastRecipients::Status)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BroadcastRecipients::Error).text().null())
                    .col(
                        ColumnDef::new(BroadcastRecipients::SentAt)
                            .big_integer()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(BroadcastRecipients::Table, BroadcastRecipients::BroadcastId)
                            .to(Broadcasts::Table, Broadcasts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(BroadcastRecipients::Table, BroadcastRecipients::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_broadcasts_status")
                    .table(Broadcasts::Table)
                    .col(Broadcasts::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_broadcast_recipients_broadcast_status")
                    .table(BroadcastRecipients::Table)
                    .col(BroadcastRecipients::BroadcastId)
                    .col(BroadcastRecipients::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BroadcastRecipients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Broadcasts::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Broadcasts {
    #[sea_orm(iden = "broadcasts")]
    Table,
    Id,
    Message,
    Status,
    Total,
    Sent,
    Failed,
    CreatedBy,
    MinDelayMs,
    MaxDelayMs,
    FinishedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BroadcastRecipients {
    #[sea_orm(iden = "broadcast_recipients")]
    Table,
    Id,
    BroadcastId,
    StudentId,
    Name,
    Phone,
    Status,
    Error,
    SentAt,
}

#[derive(DeriveIden)]
enum Users {
    #[sea_orm(iden = "users")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Students {
    #[sea_orm(iden = "students")]
    Table,
    Id,
}
