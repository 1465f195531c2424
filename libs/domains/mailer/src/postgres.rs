use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    entity,
    error::MailerResult,
    models::{
        EmailJob, EmailLogEntry, EmailTemplate, EnqueueEmail, NewLogEntry, NewTemplate,
        QueueStatus,
    },
    repository::{LogRepository, QueueRepository, TemplateRepository},
};

pub struct PgTemplateRepository {
    db: DatabaseConnection,
}

impl PgTemplateRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TemplateRepository for PgTemplateRepository {
    async fn find_active(&self, name: &str) -> MailerResult<Option<EmailTemplate>> {
        let model = entity::email_template::Entity::find()
            .filter(entity::email_template::Column::Name.eq(name))
            .filter(entity::email_template::Column::IsActive.eq(true))
            .one(&self.db)
            .await?;

        Ok(model.map(Into::into))
    }

    async fn save(&self, template: NewTemplate) -> MailerResult<EmailTemplate> {
        let existing = entity::email_template::Entity::find()
            .filter(entity::email_template::Column::Name.eq(template.name.as_str()))
            .one(&self.db)
            .await?;

        let model = match existing {
            Some(model) => {
                let mut active: entity::email_template::ActiveModel = model.into();
                active.subject = Set(template.subject);
                active.html_content = Set(template.html_content);
                active.variables = Set(serde_json::to_value(&template.variables)
                    .unwrap_or_else(|_| serde_json::Value::Array(Vec::new())));
                active.is_active = Set(template.is_active);
                active.updated_at = Set(Utc::now().into());
                active.update(&self.db).await?
            }
            None => {
                let active: entity::email_template::ActiveModel = template.into();
                active.insert(&self.db).await?
            }
        };

        tracing::info!(template = %model.name, "Saved email template");
        Ok(model.into())
    }

    async fn list(&self) -> MailerResult<Vec<EmailTemplate>> {
        let models = entity::email_template::Entity::find()
            .order_by_asc(entity::email_template::Column::Name)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}

pub struct PgQueueRepository {
    db: DatabaseConnection,
}

impl PgQueueRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QueueRepository for PgQueueRepository {
    async fn enqueue(&self, input: EnqueueEmail) -> MailerResult<EmailJob> {
        let active: entity::email_queue::ActiveModel = input.into();
        let model = active.insert(&self.db).await?;

        tracing::debug!(
            job_id = %model.id,
            template = %model.template_name,
            to = %model.recipient_email,
            "Enqueued email job"
        );
        Ok(model.into())
    }

    async fn due_batch(&self, now: DateTime<Utc>, limit: u64) -> MailerResult<Vec<EmailJob>> {
        let models = entity::email_queue::Entity::find()
            .filter(entity::email_queue::Column::Status.eq(QueueStatus::Pending))
            .filter(entity::email_queue::Column::ScheduledAt.lte(now))
            .order_by_asc(entity::email_queue::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> MailerResult<bool> {
        // Conditional update on status = pending; rows_affected tells us
        // whether this invocation won the claim.
        let result = entity::email_queue::Entity::update_many()
            .col_expr(
                entity::email_queue::Column::Status,
                Expr::value(QueueStatus::Processing),
            )
            .col_expr(entity::email_queue::Column::LastAttemptAt, Expr::value(now))
            .col_expr(entity::email_queue::Column::UpdatedAt, Expr::value(now))
            .filter(entity::email_queue::Column::Id.eq(id))
            .filter(entity::email_queue::Column::Status.eq(QueueStatus::Pending))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn mark_sent(&self, id: Uuid) -> MailerResult<()> {
        entity::email_queue::Entity::update_many()
            .col_expr(
                entity::email_queue::Column::Status,
                Expr::value(QueueStatus::Sent),
            )
            .col_expr(
                entity::email_queue::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(entity::email_queue::Column::Id.eq(id))
            .filter(entity::email_queue::Column::Status.eq(QueueStatus::Processing))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn mark_retry(
        &self,
        id: Uuid,
        retry_count: i32,
        scheduled_at: DateTime<Utc>,
        error: &str,
    ) -> MailerResult<()> {
        entity::email_queue::Entity::update_many()
            .col_expr(
                entity::email_queue::Column::Status,
                Expr::value(QueueStatus::Pending),
            )
            .col_expr(
                entity::email_queue::Column::RetryCount,
                Expr::value(retry_count),
            )
            .col_expr(
                entity::email_queue::Column::ScheduledAt,
                Expr::value(scheduled_at),
            )
            .col_expr(
                entity::email_queue::Column::ErrorMessage,
                Expr::value(Some(error.to_string())),
            )
            .col_expr(
                entity::email_queue::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(entity::email_queue::Column::Id.eq(id))
            .filter(entity::email_queue::Column::Status.eq(QueueStatus::Processing))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, retry_count: i32, error: &str) -> MailerResult<()> {
        entity::email_queue::Entity::update_many()
            .col_expr(
                entity::email_queue::Column::Status,
                Expr::value(QueueStatus::Failed),
            )
            .col_expr(
                entity::email_queue::Column::RetryCount,
                Expr::value(retry_count),
            )
            .col_expr(
                entity::email_queue::Column::ErrorMessage,
                Expr::value(Some(error.to_string())),
            )
            .col_expr(
                entity::email_queue::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(entity::email_queue::Column::Id.eq(id))
            .filter(entity::email_queue::Column::Status.eq(QueueStatus::Processing))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn find(&self, id: Uuid) -> MailerResult<Option<EmailJob>> {
        let model = entity::email_queue::Entity::find_by_id(id)
            .one(&self.db)
            .await?;

        Ok(model.map(Into::into))
    }
}

pub struct PgLogRepository {
    db: DatabaseConnection,
}

impl PgLogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LogRepository for PgLogRepository {
    async fn append(&self, entry: NewLogEntry) -> MailerResult<EmailLogEntry> {
        let active: entity::email_log::ActiveModel = entry.into();
        let model = active.insert(&self.db).await?;

        Ok(model.into())
    }

    async fn search_by_recipient(&self, fragment: &str) -> MailerResult<Vec<EmailLogEntry>> {
        let models = entity::email_log::Entity::find()
            .filter(entity::email_log::Column::RecipientEmail.contains(fragment))
            .order_by_desc(entity::email_log::Column::SentAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}
