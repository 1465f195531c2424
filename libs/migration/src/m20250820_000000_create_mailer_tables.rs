use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create email_queue_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(EmailQueueStatus::Enum)
                    .values([
                        EmailQueueStatus::Pending,
                        EmailQueueStatus::Processing,
                        EmailQueueStatus::Sent,
                        EmailQueueStatus::Failed,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create email_log_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(EmailLogStatus::Enum)
                    .values([EmailLogStatus::Sent, EmailLogStatus::Failed])
                    .to_owned(),
            )
            .await?;

        // Create email_templates table
        manager
            .create_table(
                Table::create()
                    .table(EmailTemplates::Table)
                    .if_not_exists()
                    .col(pk_uuid(EmailTemplates::Id))
                    .col(
                        ColumnDef::new(EmailTemplates::Name)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(string(EmailTemplates::Subject))
                    .col(text(EmailTemplates::HtmlContent))
                    .col(json_binary(EmailTemplates::Variables).default("[]"))
                    .col(boolean(EmailTemplates::IsActive).default(true))
                    .col(
                        timestamp_with_time_zone(EmailTemplates::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(EmailTemplates::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create email_queue table
        manager
            .create_table(
                Table::create()
                    .table(EmailQueue::Table)
                    .if_not_exists()
                    .col(pk_uuid(EmailQueue::Id))
                    .col(string_len(EmailQueue::TemplateName, 128))
                    .col(string_len(EmailQueue::RecipientEmail, 255))
                    .col(json_binary(EmailQueue::Variables).default("{}"))
                    .col(
                        ColumnDef::new(EmailQueue::Status)
                            .enumeration(
                                EmailQueueStatus::Enum,
                                [
                                    EmailQueueStatus::Pending,
                                    EmailQueueStatus::Processing,
                                    EmailQueueStatus::Sent,
                                    EmailQueueStatus::Failed,
                                ],
                            )
                            .not_null()
                            .default("pending"),
                    )
                    .col(integer(EmailQueue::RetryCount).default(0))
                    .col(integer(EmailQueue::MaxRetries).default(3))
                    .col(
                        timestamp_with_time_zone(EmailQueue::ScheduledAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(EmailQueue::LastAttemptAt))
                    .col(text_null(EmailQueue::ErrorMessage))
                    .col(
                        timestamp_with_time_zone(EmailQueue::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(EmailQueue::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create email_logs table
        manager
            .create_table(
                Table::create()
                    .table(EmailLogs::Table)
                    .if_not_exists()
                    .col(pk_uuid(EmailLogs::Id))
                    .col(uuid_null(EmailLogs::QueueId))
                    .col(string_len(EmailLogs::TemplateName, 128))
                    .col(string_len(EmailLogs::RecipientEmail, 255))
                    .col(string(EmailLogs::Subject))
                    .col(
                        ColumnDef::new(EmailLogs::Status)
                            .enumeration(
                                EmailLogStatus::Enum,
                                [EmailLogStatus::Sent, EmailLogStatus::Failed],
                            )
                            .not_null(),
                    )
                    .col(text_null(EmailLogs::ErrorMessage))
                    .col(integer(EmailLogs::RetryAttempt).default(0))
                    .col(
                        timestamp_with_time_zone(EmailLogs::SentAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create indexes
        manager
            .create_index(
                Index::create()
                    .name("idx_email_queue_status_scheduled_at")
                    .table(EmailQueue::Table)
                    .col(EmailQueue::Status)
                    .col(EmailQueue::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_queue_created_at")
                    .table(EmailQueue::Table)
                    .col(EmailQueue::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_logs_recipient_email")
                    .table(EmailLogs::Table)
                    .col(EmailLogs::RecipientEmail)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_logs_sent_at")
                    .table(EmailLogs::Table)
                    .col(EmailLogs::SentAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EmailLogs::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(EmailQueue::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(EmailTemplates::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(EmailLogStatus::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(EmailQueueStatus::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum EmailTemplates {
    Table,
    Id,
    Name,
    Subject,
    HtmlContent,
    Variables,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EmailQueue {
    Table,
    Id,
    TemplateName,
    RecipientEmail,
    Variables,
    Status,
    RetryCount,
    MaxRetries,
    ScheduledAt,
    LastAttemptAt,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EmailLogs {
    Table,
    Id,
    QueueId,
    TemplateName,
    RecipientEmail,
    Subject,
    Status,
    ErrorMessage,
    RetryAttempt,
    SentAt,
}

#[derive(DeriveIden)]
enum EmailQueueStatus {
    #[sea_orm(iden = "email_queue_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "processing")]
    Processing,
    #[sea_orm(iden = "sent")]
    Sent,
    #[sea_orm(iden = "failed")]
    Failed,
}

#[derive(DeriveIden)]
enum EmailLogStatus {
    #[sea_orm(iden = "email_log_status")]
    Enum,
    #[sea_orm(iden = "sent")]
    Sent,
    #[sea_orm(iden = "failed")]
    Failed,
}
