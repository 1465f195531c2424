//! Queue worker: claims due jobs and drives them through delivery.
//!
//! Each invocation of [`QueueWorker::process_due_batch`] is stateless: it
//! reads one batch of due jobs, processes them sequentially, and returns a
//! [`BatchReport`]. All per-attempt state lives in the queue rows, so any
//! number of invocations (cron ticks, replicas) can run against the same
//! queue; the conditional claim guarantees at most one of them delivers a
//! given job.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::MailerResult;
use crate::models::{BatchReport, EmailJob, LogStatus, NewLogEntry};
use crate::render::render;
use crate::repository::{LogRepository, QueueRepository, TemplateRepository};
use crate::transport::EmailTransport;

/// Configuration for the queue worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum jobs claimed per invocation.
    pub batch_size: u64,
    /// Delay between consecutive sends within a batch, to stay under
    /// provider rate limits.
    pub pacing_ms: u64,
    /// Linear backoff step: a job that has failed `n` times is re-scheduled
    /// `n * backoff_step_secs` seconds into the future.
    pub backoff_step_secs: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: std::env::var("MAILER_BATCH_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            pacing_ms: std::env::var("MAILER_PACING_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            // 5 minutes per accumulated failure
            backoff_step_secs: std::env::var("MAILER_BACKOFF_STEP_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
        }
    }
}

/// Outcome of one delivery attempt, before queue bookkeeping.
struct AttemptFailure {
    /// Rendered subject when the template resolved, empty otherwise.
    subject: String,
    error: String,
}

/// Worker generic over the repositories and the transport.
pub struct QueueWorker<T, Q, L, X> {
    templates: Arc<T>,
    queue: Arc<Q>,
    logs: Arc<L>,
    transport: Arc<X>,
    config: WorkerConfig,
}

impl<T, Q, L, X> QueueWorker<T, Q, L, X>
where
    T: TemplateRepository,
    Q: QueueRepository,
    L: LogRepository,
    X: EmailTransport,
{
    pub fn new(
        templates: Arc<T>,
        queue: Arc<Q>,
        logs: Arc<L>,
        transport: Arc<X>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            templates,
            queue,
            logs,
            transport,
            config,
        }
    }

    /// Process one batch of due jobs.
    ///
    /// Fails only when the due-jobs read fails; individual delivery and
    /// bookkeeping failures are absorbed into the report so one bad job
    /// cannot stall the rest of the batch.
    pub async fn process_due_batch(&self) -> MailerResult<BatchReport> {
        let now = Utc::now();
        let jobs = self.queue.due_batch(now, self.config.batch_size).await?;

        if jobs.is_empty() {
            debug!("No due email jobs");
            return Ok(BatchReport::default());
        }

        info!(count = jobs.len(), "Picked up due email jobs");

        let mut report = BatchReport::default();
        for (i, job) in jobs.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.pacing_ms)).await;
            }

            let claimed = match self.queue.claim(job.id, Utc::now()).await {
                Ok(claimed) => claimed,
                Err(e) => {
                    error!(job_id = %job.id, error = %e, "Failed to claim job");
                    continue;
                }
            };
            if !claimed {
                // Another invocation got here first, or the job already
                // went terminal.
                debug!(job_id = %job.id, "Job no longer pending, skipping");
                continue;
            }

            report.processed += 1;
            match self.deliver(job).await {
                Ok(subject) => {
                    self.record_success(job, subject).await;
                    report.successful += 1;
                }
                Err(failure) => {
                    self.record_failure(job, failure).await;
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Render the job against its template and hand it to the transport.
    async fn deliver(&self, job: &EmailJob) -> Result<String, AttemptFailure> {
        let template = match self.templates.find_active(&job.template_name).await {
            Ok(Some(template)) => template,
            Ok(None) => {
                return Err(AttemptFailure {
                    subject: String::new(),
                    error: format!("Template '{}' not found or inactive", job.template_name),
                });
            }
            Err(e) => {
                return Err(AttemptFailure {
                    subject: String::new(),
                    error: format!("Template lookup failed: {e}"),
                });
            }
        };

        let subject = render(&template.subject, &job.variables);
        let html_body = render(&template.html_content, &job.variables);

        match self
            .transport
            .send(&job.recipient_email, &subject, &html_body)
            .await
        {
            Ok(result) => {
                info!(
                    job_id = %job.id,
                    to = %job.recipient_email,
                    template = %job.template_name,
                    message_id = %result.message_id,
                    "Email sent"
                );
                Ok(subject)
            }
            Err(e) => Err(AttemptFailure {
                subject,
                error: e.to_string(),
            }),
        }
    }

    async fn record_success(&self, job: &EmailJob, subject: String) {
        if let Err(e) = self.queue.mark_sent(job.id).await {
            error!(job_id = %job.id, error = %e, "Failed to mark job sent");
        }

        let entry = NewLogEntry {
            queue_id: Some(job.id),
            template_name: job.template_name.clone(),
            recipient_email: job.recipient_email.clone(),
            subject,
            status: LogStatus::Sent,
            error_message: None,
            retry_attempt: job.retry_count,
        };
        if let Err(e) = self.logs.append(entry).await {
            error!(job_id = %job.id, error = %e, "Failed to append sent log entry");
        }
    }

    async fn record_failure(&self, job: &EmailJob, failure: AttemptFailure) {
        let retry_count = job.retry_count + 1;

        if retry_count >= job.max_retries {
            warn!(
                job_id = %job.id,
                to = %job.recipient_email,
                retry_count,
                error = %failure.error,
                "Delivery failed, retries exhausted"
            );
            if let Err(e) = self
                .queue
                .mark_failed(job.id, retry_count, &failure.error)
                .await
            {
                error!(job_id = %job.id, error = %e, "Failed to mark job failed");
            }
        } else {
            let scheduled_at =
                Utc::now() + ChronoDuration::seconds(retry_count as i64 * self.config.backoff_step_secs);
            warn!(
                job_id = %job.id,
                to = %job.recipient_email,
                retry_count,
                retry_at = %scheduled_at,
                error = %failure.error,
                "Delivery failed, scheduling retry"
            );
            if let Err(e) = self
                .queue
                .mark_retry(job.id, retry_count, scheduled_at, &failure.error)
                .await
            {
                error!(job_id = %job.id, error = %e, "Failed to schedule retry");
            }
        }

        let entry = NewLogEntry {
            queue_id: Some(job.id),
            template_name: job.template_name.clone(),
            recipient_email: job.recipient_email.clone(),
            subject: failure.subject,
            status: LogStatus::Failed,
            error_message: Some(failure.error),
            retry_attempt: retry_count,
        };
        if let Err(e) = self.logs.append(entry).await {
            error!(job_id = %job.id, error = %e, "Failed to append failed log entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockLogRepository, MockQueueRepository, MockTemplateRepository};
    use crate::transport::MockTransport;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn sample_job() -> EmailJob {
        let now = Utc::now();
        EmailJob {
            id: Uuid::now_v7(),
            template_name: "application_received".to_string(),
            recipient_email: "alice@uni.edu".to_string(),
            variables: HashMap::new(),
            status: crate::models::QueueStatus::Pending,
            retry_count: 0,
            max_retries: 3,
            scheduled_at: now,
            last_attempt_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_lost_claim_is_skipped() {
        let job = sample_job();

        let mut queue = MockQueueRepository::new();
        let due = job.clone();
        queue
            .expect_due_batch()
            .returning(move |_, _| Ok(vec![due.clone()]));
        // Another invocation wins the claim; nothing else may happen.
        queue.expect_claim().returning(|_, _| Ok(false));
        queue.expect_mark_sent().never();
        queue.expect_mark_retry().never();
        queue.expect_mark_failed().never();

        let mut logs = MockLogRepository::new();
        logs.expect_append().never();

        let worker = QueueWorker::new(
            Arc::new(MockTemplateRepository::new()),
            Arc::new(queue),
            Arc::new(logs),
            Arc::new(MockTransport::new()),
            WorkerConfig {
                batch_size: 10,
                pacing_ms: 0,
                backoff_step_secs: 0,
            },
        );

        let report = worker.process_due_batch().await.unwrap();
        assert_eq!(report, BatchReport::default());
    }

    #[test]
    fn test_worker_config_default() {
        temp_env::with_vars_unset(
            [
                "MAILER_BATCH_SIZE",
                "MAILER_PACING_MS",
                "MAILER_BACKOFF_STEP_SECS",
            ],
            || {
                let config = WorkerConfig::default();
                assert_eq!(config.batch_size, 10);
                assert_eq!(config.pacing_ms, 1000);
                assert_eq!(config.backoff_step_secs, 300);
            },
        );
    }

    #[test]
    fn test_worker_config_from_env() {
        temp_env::with_vars(
            [
                ("MAILER_BATCH_SIZE", Some("25")),
                ("MAILER_PACING_MS", Some("0")),
            ],
            || {
                let config = WorkerConfig::default();
                assert_eq!(config.batch_size, 25);
                assert_eq!(config.pacing_ms, 0);
            },
        );
    }
}
