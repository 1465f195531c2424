use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::MailerResult;
use crate::models::{
    EmailJob, EmailLogEntry, EmailTemplate, EnqueueEmail, NewLogEntry, NewTemplate,
};

/// Data access for email templates.
///
/// Templates are administered out-of-band; the worker only ever reads
/// active templates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Look up a template by name, returning it only when active.
    async fn find_active(&self, name: &str) -> MailerResult<Option<EmailTemplate>>;

    /// Create or replace a template by name.
    async fn save(&self, template: NewTemplate) -> MailerResult<EmailTemplate>;

    /// List all templates (admin surface).
    async fn list(&self) -> MailerResult<Vec<EmailTemplate>>;
}

/// Data access for the durable email job queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert a new pending job. No transport call happens here; template
    /// existence is deliberately not validated at enqueue time.
    async fn enqueue(&self, input: EnqueueEmail) -> MailerResult<EmailJob>;

    /// Jobs with `status = pending AND scheduled_at <= now`, oldest
    /// created first, limited to `limit`.
    async fn due_batch(&self, now: DateTime<Utc>, limit: u64) -> MailerResult<Vec<EmailJob>>;

    /// Atomically claim a pending job for processing. Returns `false` when
    /// the job was no longer pending (claimed by a concurrent invocation,
    /// or already terminal). Implementations must use a conditional update,
    /// not read-then-write, so at most one invocation can hold a job.
    async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> MailerResult<bool>;

    /// Transition a processing job to terminal `sent`.
    async fn mark_sent(&self, id: Uuid) -> MailerResult<()>;

    /// Re-queue a processing job for a later attempt.
    async fn mark_retry(
        &self,
        id: Uuid,
        retry_count: i32,
        scheduled_at: DateTime<Utc>,
        error: &str,
    ) -> MailerResult<()>;

    /// Transition a processing job to terminal `failed`.
    async fn mark_failed(&self, id: Uuid, retry_count: i32, error: &str) -> MailerResult<()>;

    /// Fetch a job by id.
    async fn find(&self, id: Uuid) -> MailerResult<Option<EmailJob>>;
}

/// Append-only data access for delivery-attempt logs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogRepository: Send + Sync {
    /// Append one entry per delivery attempt. Entries are never mutated
    /// or deleted.
    async fn append(&self, entry: NewLogEntry) -> MailerResult<EmailLogEntry>;

    /// Operator query: entries whose recipient contains `fragment`,
    /// newest first.
    async fn search_by_recipient(&self, fragment: &str) -> MailerResult<Vec<EmailLogEntry>>;
}
