//! Producer surface: the API the web application uses to queue emails.
//!
//! Enqueueing never touches the transport and never renders anything; it
//! only writes a pending row. The worker picks it up on its next batch.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::MailerResult;
use crate::models::{EmailJob, EmailLogEntry, EmailTemplate, EnqueueEmail, NewTemplate};
use crate::render::coerce_variables;
use crate::repository::{LogRepository, QueueRepository, TemplateRepository};

/// Confirmation sent when an application is submitted.
pub const TEMPLATE_APPLICATION_RECEIVED: &str = "application_received";
/// Notification sent when an application's review status changes.
pub const TEMPLATE_STATUS_UPDATE: &str = "status_update";
/// Announcement sent to a list of recipients for an upcoming event.
pub const TEMPLATE_EVENT_ANNOUNCEMENT: &str = "event_announcement";

pub struct MailerService<T, Q, L> {
    templates: Arc<T>,
    queue: Arc<Q>,
    logs: Arc<L>,
}

impl<T, Q, L> MailerService<T, Q, L>
where
    T: TemplateRepository,
    Q: QueueRepository,
    L: LogRepository,
{
    pub fn new(templates: Arc<T>, queue: Arc<Q>, logs: Arc<L>) -> Self {
        Self {
            templates,
            queue,
            logs,
        }
    }

    /// Create or replace a template (admin surface).
    pub async fn register_template(&self, template: NewTemplate) -> MailerResult<EmailTemplate> {
        self.templates.save(template).await
    }

    pub async fn list_templates(&self) -> MailerResult<Vec<EmailTemplate>> {
        self.templates.list().await
    }

    /// Queue an email for delivery. Returns the job id.
    pub async fn enqueue(&self, input: EnqueueEmail) -> MailerResult<Uuid> {
        let job = self.queue.enqueue(input).await?;
        info!(
            job_id = %job.id,
            template = %job.template_name,
            to = %job.recipient_email,
            scheduled_at = %job.scheduled_at,
            "Queued email"
        );
        Ok(job.id)
    }

    /// Queue an email with a raw JSON variable bag, as received from an
    /// HTTP handler. Scalar values are coerced to strings; nested values
    /// are rejected.
    pub async fn enqueue_json(
        &self,
        template_name: &str,
        recipient_email: &str,
        variables: &serde_json::Value,
    ) -> MailerResult<Uuid> {
        let variables = coerce_variables(variables)?;
        self.enqueue(EnqueueEmail::new(template_name, recipient_email, variables))
            .await
    }

    /// Queue the application-received confirmation.
    pub async fn queue_application_received(
        &self,
        to: &str,
        applicant_name: &str,
        position: &str,
    ) -> MailerResult<Uuid> {
        let variables = HashMap::from([
            ("applicantName".to_string(), applicant_name.to_string()),
            ("position".to_string(), position.to_string()),
        ]);
        self.enqueue(EnqueueEmail::new(TEMPLATE_APPLICATION_RECEIVED, to, variables))
            .await
    }

    /// Queue a status-update notification.
    pub async fn queue_status_update(
        &self,
        to: &str,
        applicant_name: &str,
        position: &str,
        status: &str,
    ) -> MailerResult<Uuid> {
        let variables = HashMap::from([
            ("applicantName".to_string(), applicant_name.to_string()),
            ("position".to_string(), position.to_string()),
            ("status".to_string(), status.to_string()),
        ]);
        self.enqueue(EnqueueEmail::new(TEMPLATE_STATUS_UPDATE, to, variables))
            .await
    }

    /// Queue one event announcement per recipient.
    ///
    /// A failed enqueue for one recipient does not abort the rest; the
    /// returned ids cover the jobs that were queued.
    pub async fn queue_event_broadcast(
        &self,
        recipients: &[String],
        event_name: &str,
        event_date: &str,
        location: &str,
    ) -> MailerResult<Vec<Uuid>> {
        let variables = HashMap::from([
            ("eventName".to_string(), event_name.to_string()),
            ("eventDate".to_string(), event_date.to_string()),
            ("location".to_string(), location.to_string()),
        ]);

        let mut job_ids = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let input = EnqueueEmail::new(TEMPLATE_EVENT_ANNOUNCEMENT, recipient, variables.clone());
            match self.enqueue(input).await {
                Ok(id) => job_ids.push(id),
                Err(e) => {
                    error!(to = %recipient, error = %e, "Failed to queue event announcement");
                }
            }
        }

        info!(
            event = %event_name,
            queued = job_ids.len(),
            recipients = recipients.len(),
            "Queued event broadcast"
        );
        Ok(job_ids)
    }

    /// Delivery history for recipients matching `fragment`, newest first.
    pub async fn recent_logs(&self, fragment: &str) -> MailerResult<Vec<EmailLogEntry>> {
        self.logs.search_by_recipient(fragment).await
    }

    pub async fn job(&self, id: Uuid) -> MailerResult<Option<EmailJob>> {
        self.queue.find(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryLogRepository, InMemoryQueueRepository, InMemoryTemplateRepository};
    use crate::models::{QueueStatus, DEFAULT_MAX_RETRIES};

    fn service() -> (
        MailerService<InMemoryTemplateRepository, InMemoryQueueRepository, InMemoryLogRepository>,
        Arc<InMemoryQueueRepository>,
    ) {
        let templates = Arc::new(InMemoryTemplateRepository::new());
        let queue = Arc::new(InMemoryQueueRepository::new());
        let logs = Arc::new(InMemoryLogRepository::new());
        (
            MailerService::new(templates, queue.clone(), logs),
            queue,
        )
    }

    #[tokio::test]
    async fn test_enqueue_creates_pending_job() {
        let (service, queue) = service();

        let id = service
            .queue_application_received("alice@uni.edu", "Alice", "ML Engineer")
            .await
            .unwrap();

        let job = queue.find(id).await.unwrap().unwrap();
        assert_eq!(job.status, QueueStatus::Pending);
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(job.template_name, TEMPLATE_APPLICATION_RECEIVED);
        assert_eq!(job.variables.get("applicantName").unwrap(), "Alice");
    }

    #[tokio::test]
    async fn test_enqueue_json_coerces_scalars() {
        let (service, queue) = service();

        let id = service
            .enqueue_json(
                "status_update",
                "bob@uni.edu",
                &serde_json::json!({"position": "Researcher", "round": 2}),
            )
            .await
            .unwrap();

        let job = queue.find(id).await.unwrap().unwrap();
        assert_eq!(job.variables.get("round").unwrap(), "2");
    }

    #[tokio::test]
    async fn test_enqueue_json_rejects_nested_values() {
        let (service, _) = service();

        let result = service
            .enqueue_json(
                "status_update",
                "bob@uni.edu",
                &serde_json::json!({"applicant": {"name": "Bob"}}),
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_event_broadcast_queues_one_job_per_recipient() {
        let (service, queue) = service();

        let recipients = vec![
            "a@uni.edu".to_string(),
            "b@uni.edu".to_string(),
            "c@uni.edu".to_string(),
        ];
        let ids = service
            .queue_event_broadcast(&recipients, "Intro to RL", "2025-10-01", "Room 204")
            .await
            .unwrap();

        assert_eq!(ids.len(), 3);
        let jobs = queue.all().await;
        assert_eq!(jobs.len(), 3);
        assert!(jobs
            .iter()
            .all(|j| j.template_name == TEMPLATE_EVENT_ANNOUNCEMENT));
        assert!(jobs.iter().all(|j| j.variables.get("eventName").unwrap() == "Intro to RL"));
    }
}
