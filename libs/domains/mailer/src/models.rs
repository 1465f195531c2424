use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};
use uuid::Uuid;

/// Default number of delivery attempts before a job goes terminal.
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// Lifecycle state of a queued email job.
///
/// pending → processing → {sent | pending (retry) | failed}.
/// `sent` and `failed` are terminal; the worker never touches them again.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "email_queue_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueStatus {
    /// Waiting for pickup (initial state, also re-entered on retry)
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Claimed by a worker invocation, delivery in flight
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Transport accepted the message
    #[sea_orm(string_value = "sent")]
    Sent,
    /// Retries exhausted
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl QueueStatus {
    /// Whether no further transitions can occur from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Sent | QueueStatus::Failed)
    }
}

/// Outcome recorded for a single delivery attempt.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "email_log_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogStatus {
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// A named email template with `{{placeholder}}` substitution.
///
/// Jobs reference templates by name and render against the template current
/// at send time, not at enqueue time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: Uuid,
    /// Unique lookup key
    pub name: String,
    /// Subject pattern
    pub subject: String,
    /// HTML body pattern
    pub html_content: String,
    /// Declared placeholder names (informational only, not enforced at render time)
    pub variables: Vec<String>,
    /// Only active templates are resolvable by the worker
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating or replacing a template (admin surface).
#[derive(Debug, Clone, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub subject: String,
    pub html_content: String,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// A queued email job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    pub id: Uuid,
    /// Soft reference to [`EmailTemplate::name`]; existence is checked at
    /// send time, not at enqueue time
    pub template_name: String,
    /// Opaque recipient string; not validated for RFC-5322 correctness here
    pub recipient_email: String,
    /// Variable bag rendered into the template at send time
    pub variables: HashMap<String, String>,
    pub status: QueueStatus,
    /// Attempts so far; never exceeds `max_retries` while not failed
    pub retry_count: i32,
    pub max_retries: i32,
    /// Job is not eligible for pickup before this time
    pub scheduled_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for enqueueing a new email job.
#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueEmail {
    pub template_name: String,
    pub recipient_email: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// Defaults to "now" when omitted; set a future time for deferred sends
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Per-job override of [`DEFAULT_MAX_RETRIES`]
    pub max_retries: Option<i32>,
}

impl EnqueueEmail {
    pub fn new(
        template_name: impl Into<String>,
        recipient_email: impl Into<String>,
        variables: HashMap<String, String>,
    ) -> Self {
        Self {
            template_name: template_name.into(),
            recipient_email: recipient_email.into(),
            variables,
            scheduled_at: None,
            max_retries: None,
        }
    }

    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Immutable record of one delivery attempt (success or failure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLogEntry {
    pub id: Uuid,
    /// Back-reference to the job; nullable because some producers log
    /// without a queue record
    pub queue_id: Option<Uuid>,
    pub template_name: String,
    pub recipient_email: String,
    /// The *rendered* subject, not the template pattern
    pub subject: String,
    pub status: LogStatus,
    pub error_message: Option<String>,
    /// Snapshot of the job's retry_count at the time of this attempt
    pub retry_attempt: i32,
    pub sent_at: DateTime<Utc>,
}

/// DTO for appending a log entry.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub queue_id: Option<Uuid>,
    pub template_name: String,
    pub recipient_email: String,
    pub subject: String,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub retry_attempt: i32,
}

/// Counts reported by one worker invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Jobs claimed by this invocation
    pub processed: usize,
    /// Jobs that reached `sent`
    pub successful: usize,
    /// Jobs whose attempt failed (retry scheduled or terminal `failed`)
    pub failed: usize,
}
