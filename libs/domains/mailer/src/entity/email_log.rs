use crate::models::LogStatus;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the append-only `email_logs` table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub queue_id: Option<Uuid>,
    pub template_name: String,
    pub recipient_email: String,
    pub subject: String,
    pub status: LogStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub retry_attempt: i32,
    pub sent_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::EmailLogEntry {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            queue_id: model.queue_id,
            template_name: model.template_name,
            recipient_email: model.recipient_email,
            subject: model.subject,
            status: model.status,
            error_message: model.error_message,
            retry_attempt: model.retry_attempt,
            sent_at: model.sent_at.into(),
        }
    }
}

impl From<crate::models::NewLogEntry> for ActiveModel {
    fn from(input: crate::models::NewLogEntry) -> Self {
        ActiveModel {
            id: Set(Uuid::now_v7()),
            queue_id: Set(input.queue_id),
            template_name: Set(input.template_name),
            recipient_email: Set(input.recipient_email),
            subject: Set(input.subject),
            status: Set(input.status),
            error_message: Set(input.error_message),
            retry_attempt: Set(input.retry_attempt),
            sent_at: Set(chrono::Utc::now().into()),
        }
    }
}
