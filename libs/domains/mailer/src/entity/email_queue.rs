use crate::models::{QueueStatus, DEFAULT_MAX_RETRIES};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the `email_queue` table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_queue")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub template_name: String,
    pub recipient_email: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub variables: Json,
    pub status: QueueStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub scheduled_at: DateTimeWithTimeZone,
    pub last_attempt_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::EmailJob {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            template_name: model.template_name,
            recipient_email: model.recipient_email,
            variables: serde_json::from_value(model.variables).unwrap_or_default(),
            status: model.status,
            retry_count: model.retry_count,
            max_retries: model.max_retries,
            scheduled_at: model.scheduled_at.into(),
            last_attempt_at: model.last_attempt_at.map(Into::into),
            error_message: model.error_message,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<crate::models::EnqueueEmail> for ActiveModel {
    fn from(input: crate::models::EnqueueEmail) -> Self {
        let now = chrono::Utc::now();
        ActiveModel {
            id: Set(Uuid::now_v7()),
            template_name: Set(input.template_name),
            recipient_email: Set(input.recipient_email),
            variables: Set(serde_json::to_value(&input.variables)
                .unwrap_or_else(|_| Json::Object(Default::default()))),
            status: Set(QueueStatus::Pending),
            retry_count: Set(0),
            max_retries: Set(input.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)),
            scheduled_at: Set(input.scheduled_at.unwrap_or(now).into()),
            last_attempt_at: Set(None),
            error_message: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }
}
