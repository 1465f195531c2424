//! End-to-end worker scenarios against the in-memory repositories and the
//! mock transport.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use domain_mailer::{
    EnqueueEmail, InMemoryLogRepository, InMemoryQueueRepository, InMemoryTemplateRepository,
    LogRepository, LogStatus, MockTransport, NewTemplate, QueueRepository, QueueStatus,
    QueueWorker, TemplateRepository, WorkerConfig,
};

struct Harness {
    templates: Arc<InMemoryTemplateRepository>,
    queue: Arc<InMemoryQueueRepository>,
    logs: Arc<InMemoryLogRepository>,
    transport: Arc<MockTransport>,
}

impl Harness {
    fn new(transport: MockTransport) -> Self {
        Self {
            templates: Arc::new(InMemoryTemplateRepository::new()),
            queue: Arc::new(InMemoryQueueRepository::new()),
            logs: Arc::new(InMemoryLogRepository::new()),
            transport: Arc::new(transport),
        }
    }

    fn worker(
        &self,
        config: WorkerConfig,
    ) -> QueueWorker<
        InMemoryTemplateRepository,
        InMemoryQueueRepository,
        InMemoryLogRepository,
        MockTransport,
    > {
        QueueWorker::new(
            self.templates.clone(),
            self.queue.clone(),
            self.logs.clone(),
            self.transport.clone(),
            config,
        )
    }

    async fn register_welcome_template(&self) {
        self.templates
            .save(NewTemplate {
                name: "application_received".to_string(),
                subject: "Application received: {{position}}".to_string(),
                html_content: "<p>Hi {{applicantName}}, we got your application for {{position}}.{{signature}}</p>"
                    .to_string(),
                variables: vec!["applicantName".to_string(), "position".to_string()],
                is_active: true,
            })
            .await
            .unwrap();
    }
}

fn fast_config(batch_size: u64) -> WorkerConfig {
    WorkerConfig {
        batch_size,
        pacing_ms: 0,
        backoff_step_secs: 0,
    }
}

fn application_vars(name: &str) -> HashMap<String, String> {
    HashMap::from([
        ("applicantName".to_string(), name.to_string()),
        ("position".to_string(), "ML Engineer".to_string()),
    ])
}

#[tokio::test]
async fn test_successful_delivery_marks_sent_and_logs() {
    let h = Harness::new(MockTransport::new());
    h.register_welcome_template().await;

    let job = h
        .queue
        .enqueue(EnqueueEmail::new(
            "application_received",
            "alice@uni.edu",
            application_vars("Alice"),
        ))
        .await
        .unwrap();

    let report = h.worker(fast_config(10)).process_due_batch().await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 0);

    let job = h.queue.find(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, QueueStatus::Sent);
    assert_eq!(job.retry_count, 0);
    assert!(job.last_attempt_at.is_some());

    // Rendered output: known keys substituted, unknown key blanked out,
    // no HTML escaping.
    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@uni.edu");
    assert_eq!(sent[0].subject, "Application received: ML Engineer");
    assert_eq!(
        sent[0].html_body,
        "<p>Hi Alice, we got your application for ML Engineer.</p>"
    );

    // Exactly one log entry per attempt, carrying the rendered subject.
    let logs = h.logs.all().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, LogStatus::Sent);
    assert_eq!(logs[0].retry_attempt, 0);
    assert_eq!(logs[0].queue_id, Some(job.id));
    assert_eq!(logs[0].subject, "Application received: ML Engineer");
    assert!(logs[0].error_message.is_none());
}

#[tokio::test]
async fn test_transport_failure_schedules_linear_backoff() {
    let h = Harness::new(MockTransport::failing("connection refused"));
    h.register_welcome_template().await;

    let job = h
        .queue
        .enqueue(EnqueueEmail::new(
            "application_received",
            "alice@uni.edu",
            application_vars("Alice"),
        ))
        .await
        .unwrap();

    let config = WorkerConfig {
        batch_size: 10,
        pacing_ms: 0,
        backoff_step_secs: 300,
    };
    let before = Utc::now();
    let report = h.worker(config).process_due_batch().await.unwrap();
    assert_eq!(report.failed, 1);

    // First failure: back in pending, one backoff step in the future.
    let job = h.queue.find(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, QueueStatus::Pending);
    assert_eq!(job.retry_count, 1);
    assert!(job.scheduled_at >= before + Duration::seconds(299));
    assert!(job.error_message.as_deref().unwrap().contains("connection refused"));

    // Not due yet, so a second invocation leaves it alone.
    let report = h.worker(fast_config(10)).process_due_batch().await.unwrap();
    assert_eq!(report.processed, 0);
}

#[tokio::test]
async fn test_retries_exhausted_goes_terminal() {
    let h = Harness::new(MockTransport::failing("mailbox unavailable"));
    h.register_welcome_template().await;

    let job = h
        .queue
        .enqueue(
            EnqueueEmail::new(
                "application_received",
                "bob@uni.edu",
                application_vars("Bob"),
            )
            .max_retries(2),
        )
        .await
        .unwrap();

    let worker = h.worker(fast_config(10));

    // Attempt 1: retry scheduled (backoff step 0, so due immediately).
    worker.process_due_batch().await.unwrap();
    let state = h.queue.find(job.id).await.unwrap().unwrap();
    assert_eq!(state.status, QueueStatus::Pending);
    assert_eq!(state.retry_count, 1);

    // Attempt 2: retry_count reaches max_retries, terminal failure.
    worker.process_due_batch().await.unwrap();
    let state = h.queue.find(job.id).await.unwrap().unwrap();
    assert_eq!(state.status, QueueStatus::Failed);
    assert_eq!(state.retry_count, 2);

    // One failed log entry per attempt, retry_attempt post-increment.
    let logs = h.logs.all().await;
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|e| e.status == LogStatus::Failed));
    assert_eq!(logs[0].retry_attempt, 1);
    assert_eq!(logs[1].retry_attempt, 2);

    // Terminal jobs are never re-selected or mutated.
    let report = worker.process_due_batch().await.unwrap();
    assert_eq!(report.processed, 0);
    let after = h.queue.find(job.id).await.unwrap().unwrap();
    assert_eq!(after.status, QueueStatus::Failed);
    assert_eq!(after.retry_count, 2);
    assert_eq!(h.logs.all().await.len(), 2);
}

#[tokio::test]
async fn test_missing_template_is_ordinary_failure() {
    let h = Harness::new(MockTransport::new());
    // No template registered at all.

    let job = h
        .queue
        .enqueue(EnqueueEmail::new(
            "no_such_template",
            "carol@uni.edu",
            HashMap::new(),
        ))
        .await
        .unwrap();

    let report = h.worker(fast_config(10)).process_due_batch().await.unwrap();
    assert_eq!(report.failed, 1);

    let state = h.queue.find(job.id).await.unwrap().unwrap();
    assert_eq!(state.status, QueueStatus::Pending);
    assert_eq!(state.retry_count, 1);

    // Nothing reached the transport; the log entry has no rendered subject.
    assert_eq!(h.transport.sent_count().await, 0);
    let logs = h.logs.all().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, LogStatus::Failed);
    assert_eq!(logs[0].subject, "");
    assert!(logs[0].error_message.as_deref().unwrap().contains("no_such_template"));
}

#[tokio::test]
async fn test_inactive_template_is_failure() {
    let h = Harness::new(MockTransport::new());
    h.templates
        .save(NewTemplate {
            name: "retired".to_string(),
            subject: "old".to_string(),
            html_content: "old".to_string(),
            variables: vec![],
            is_active: false,
        })
        .await
        .unwrap();

    h.queue
        .enqueue(EnqueueEmail::new("retired", "dan@uni.edu", HashMap::new()))
        .await
        .unwrap();

    let report = h.worker(fast_config(10)).process_due_batch().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(h.transport.sent_count().await, 0);
}

#[tokio::test]
async fn test_batch_is_bounded_and_oldest_first() {
    let h = Harness::new(MockTransport::new());
    h.register_welcome_template().await;

    let mut ids = Vec::new();
    for name in ["first", "second", "third"] {
        let job = h
            .queue
            .enqueue(EnqueueEmail::new(
                "application_received",
                format!("{name}@uni.edu"),
                application_vars(name),
            ))
            .await
            .unwrap();
        ids.push(job.id);
    }

    let worker = h.worker(fast_config(2));
    let report = worker.process_due_batch().await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.successful, 2);

    // Oldest two delivered, in enqueue order; the third is untouched.
    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "first@uni.edu");
    assert_eq!(sent[1].to, "second@uni.edu");
    let third = h.queue.find(ids[2]).await.unwrap().unwrap();
    assert_eq!(third.status, QueueStatus::Pending);

    let report = worker.process_due_batch().await.unwrap();
    assert_eq!(report.processed, 1);
    assert!(h.transport.was_sent_to("third@uni.edu").await);
}

#[tokio::test]
async fn test_future_scheduled_job_is_not_picked_up() {
    let h = Harness::new(MockTransport::new());
    h.register_welcome_template().await;

    let job = h
        .queue
        .enqueue(
            EnqueueEmail::new(
                "application_received",
                "eve@uni.edu",
                application_vars("Eve"),
            )
            .scheduled_at(Utc::now() + Duration::hours(1)),
        )
        .await
        .unwrap();

    let report = h.worker(fast_config(10)).process_due_batch().await.unwrap();
    assert_eq!(report.processed, 0);

    let state = h.queue.find(job.id).await.unwrap().unwrap();
    assert_eq!(state.status, QueueStatus::Pending);
    assert_eq!(state.retry_count, 0);
}

#[tokio::test]
async fn test_log_search_by_recipient_newest_first() {
    let h = Harness::new(MockTransport::new());
    h.register_welcome_template().await;

    for name in ["alice", "bob", "alice"] {
        h.queue
            .enqueue(EnqueueEmail::new(
                "application_received",
                format!("{name}@uni.edu"),
                application_vars(name),
            ))
            .await
            .unwrap();
        // One job per batch so log entries get distinct append order.
        h.worker(fast_config(1)).process_due_batch().await.unwrap();
    }

    let hits = h.logs.search_by_recipient("alice").await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].sent_at >= hits[1].sent_at);

    let all = h.logs.search_by_recipient("@uni.edu").await.unwrap();
    assert_eq!(all.len(), 3);

    let none = h.logs.search_by_recipient("nobody").await.unwrap();
    assert!(none.is_empty());
}
