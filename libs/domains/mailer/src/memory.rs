//! In-memory repository implementations.
//!
//! Used by tests and local development; the worker is exercised against
//! these fakes without a database. Behavior mirrors the Postgres
//! implementations, including the conditional-claim semantics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::MailerResult;
use crate::models::{
    EmailJob, EmailLogEntry, EmailTemplate, EnqueueEmail, NewLogEntry, NewTemplate, QueueStatus,
    DEFAULT_MAX_RETRIES,
};
use crate::repository::{LogRepository, QueueRepository, TemplateRepository};

#[derive(Default)]
pub struct InMemoryTemplateRepository {
    templates: Arc<RwLock<HashMap<String, EmailTemplate>>>,
}

impl InMemoryTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn find_active(&self, name: &str) -> MailerResult<Option<EmailTemplate>> {
        let guard = self.templates.read().await;
        Ok(guard.get(name).filter(|t| t.is_active).cloned())
    }

    async fn save(&self, template: NewTemplate) -> MailerResult<EmailTemplate> {
        let now = Utc::now();
        let mut guard = self.templates.write().await;

        let saved = match guard.get(&template.name) {
            Some(existing) => EmailTemplate {
                id: existing.id,
                name: template.name.clone(),
                subject: template.subject,
                html_content: template.html_content,
                variables: template.variables,
                is_active: template.is_active,
                created_at: existing.created_at,
                updated_at: now,
            },
            None => EmailTemplate {
                id: Uuid::now_v7(),
                name: template.name.clone(),
                subject: template.subject,
                html_content: template.html_content,
                variables: template.variables,
                is_active: template.is_active,
                created_at: now,
                updated_at: now,
            },
        };

        guard.insert(saved.name.clone(), saved.clone());
        Ok(saved)
    }

    async fn list(&self) -> MailerResult<Vec<EmailTemplate>> {
        let guard = self.templates.read().await;
        let mut templates: Vec<_> = guard.values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }
}

#[derive(Default)]
pub struct InMemoryQueueRepository {
    jobs: Arc<RwLock<HashMap<Uuid, EmailJob>>>,
}

impl InMemoryQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all jobs, for assertions.
    pub async fn all(&self) -> Vec<EmailJob> {
        let guard = self.jobs.read().await;
        let mut jobs: Vec<_> = guard.values().cloned().collect();
        jobs.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        jobs
    }
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn enqueue(&self, input: EnqueueEmail) -> MailerResult<EmailJob> {
        let now = Utc::now();
        let job = EmailJob {
            id: Uuid::now_v7(),
            template_name: input.template_name,
            recipient_email: input.recipient_email,
            variables: input.variables,
            status: QueueStatus::Pending,
            retry_count: 0,
            max_retries: input.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            scheduled_at: input.scheduled_at.unwrap_or(now),
            last_attempt_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn due_batch(&self, now: DateTime<Utc>, limit: u64) -> MailerResult<Vec<EmailJob>> {
        let guard = self.jobs.read().await;
        let mut due: Vec<_> = guard
            .values()
            .filter(|j| j.status == QueueStatus::Pending && j.scheduled_at <= now)
            .cloned()
            .collect();
        due.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> MailerResult<bool> {
        let mut guard = self.jobs.write().await;
        match guard.get_mut(&id) {
            Some(job) if job.status == QueueStatus::Pending => {
                job.status = QueueStatus::Processing;
                job.last_attempt_at = Some(now);
                job.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_sent(&self, id: Uuid) -> MailerResult<()> {
        let mut guard = self.jobs.write().await;
        if let Some(job) = guard.get_mut(&id) {
            if job.status == QueueStatus::Processing {
                job.status = QueueStatus::Sent;
                job.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn mark_retry(
        &self,
        id: Uuid,
        retry_count: i32,
        scheduled_at: DateTime<Utc>,
        error: &str,
    ) -> MailerResult<()> {
        let mut guard = self.jobs.write().await;
        if let Some(job) = guard.get_mut(&id) {
            if job.status == QueueStatus::Processing {
                job.status = QueueStatus::Pending;
                job.retry_count = retry_count;
                job.scheduled_at = scheduled_at;
                job.error_message = Some(error.to_string());
                job.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, retry_count: i32, error: &str) -> MailerResult<()> {
        let mut guard = self.jobs.write().await;
        if let Some(job) = guard.get_mut(&id) {
            if job.status == QueueStatus::Processing {
                job.status = QueueStatus::Failed;
                job.retry_count = retry_count;
                job.error_message = Some(error.to_string());
                job.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn find(&self, id: Uuid) -> MailerResult<Option<EmailJob>> {
        let guard = self.jobs.read().await;
        Ok(guard.get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryLogRepository {
    entries: Arc<RwLock<Vec<EmailLogEntry>>>,
}

impl InMemoryLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries in append order, for assertions.
    pub async fn all(&self) -> Vec<EmailLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl LogRepository for InMemoryLogRepository {
    async fn append(&self, entry: NewLogEntry) -> MailerResult<EmailLogEntry> {
        let logged = EmailLogEntry {
            id: Uuid::now_v7(),
            queue_id: entry.queue_id,
            template_name: entry.template_name,
            recipient_email: entry.recipient_email,
            subject: entry.subject,
            status: entry.status,
            error_message: entry.error_message,
            retry_attempt: entry.retry_attempt,
            sent_at: Utc::now(),
        };

        self.entries.write().await.push(logged.clone());
        Ok(logged)
    }

    async fn search_by_recipient(&self, fragment: &str) -> MailerResult<Vec<EmailLogEntry>> {
        let guard = self.entries.read().await;
        Ok(guard
            .iter()
            .rev()
            .filter(|e| e.recipient_email.contains(fragment))
            .cloned()
            .collect())
    }
}
