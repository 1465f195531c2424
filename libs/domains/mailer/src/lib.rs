//! Mailer Domain
//!
//! Durable email queue for the club recruitment app: producers enqueue
//! template-based jobs, a batch worker renders and delivers them, and
//! every attempt lands in an append-only log.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐      ┌─────────────┐
//! │   Service   │      │ QueueWorker │  ← enqueue / deliver
//! └──────┬──────┘      └──────┬──────┘
//!        │      ┌─────────────┤
//! ┌──────▼──────▼┐     ┌──────▼──────┐
//! │ Repositories │     │  Transport  │  ← Postgres / SMTP
//! └──────┬───────┘     └─────────────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← jobs, templates, log entries
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_mailer::{
//!     MailerService, PgLogRepository, PgQueueRepository, PgTemplateRepository,
//!     QueueWorker, SmtpTransport, WorkerConfig,
//! };
//! use sea_orm::Database;
//!
//! # async fn example() -> eyre::Result<()> {
//! let db = Database::connect("postgres://...").await?;
//!
//! let templates = Arc::new(PgTemplateRepository::new(db.clone()));
//! let queue = Arc::new(PgQueueRepository::new(db.clone()));
//! let logs = Arc::new(PgLogRepository::new(db));
//! let transport = Arc::new(SmtpTransport::from_env()?);
//!
//! let worker = QueueWorker::new(templates, queue, logs, transport, WorkerConfig::default());
//! let report = worker.process_due_batch().await?;
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod render;
pub mod repository;
pub mod service;
pub mod transport;
pub mod worker;

// Re-export commonly used types
pub use error::{MailerError, MailerResult};
pub use memory::{InMemoryLogRepository, InMemoryQueueRepository, InMemoryTemplateRepository};
pub use models::{
    BatchReport, EmailJob, EmailLogEntry, EmailTemplate, EnqueueEmail, LogStatus, NewLogEntry,
    NewTemplate, QueueStatus, DEFAULT_MAX_RETRIES,
};
pub use postgres::{PgLogRepository, PgQueueRepository, PgTemplateRepository};
pub use render::{coerce_variables, render};
pub use repository::{LogRepository, QueueRepository, TemplateRepository};
pub use service::{
    MailerService, TEMPLATE_APPLICATION_RECEIVED, TEMPLATE_EVENT_ANNOUNCEMENT,
    TEMPLATE_STATUS_UPDATE,
};
pub use transport::{EmailTransport, MockTransport, SendResult, SmtpTransport};
pub use worker::{QueueWorker, WorkerConfig};
