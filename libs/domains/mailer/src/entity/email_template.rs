use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the `email_templates` table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub html_content: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub variables: Json,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::EmailTemplate {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            subject: model.subject,
            html_content: model.html_content,
            variables: serde_json::from_value(model.variables).unwrap_or_default(),
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<crate::models::NewTemplate> for ActiveModel {
    fn from(input: crate::models::NewTemplate) -> Self {
        let now = chrono::Utc::now();
        ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name),
            subject: Set(input.subject),
            html_content: Set(input.html_content),
            variables: Set(serde_json::to_value(&input.variables)
                .unwrap_or_else(|_| Json::Array(Vec::new()))),
            is_active: Set(input.is_active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }
}
