use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Template not found or inactive: {0}")]
    TemplateNotFound(String),

    #[error("Invalid variables: {0}")]
    InvalidVariables(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type MailerResult<T> = Result<T, MailerError>;

impl From<sea_orm::DbErr> for MailerError {
    fn from(err: sea_orm::DbErr) -> Self {
        MailerError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for MailerError {
    fn from(err: serde_json::Error) -> Self {
        MailerError::Internal(err.to_string())
    }
}
