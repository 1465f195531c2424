//! Mailer Worker Service
//!
//! A stateless batch worker that delivers queued emails for the club
//! recruitment app. One invocation processes one batch of due jobs and
//! exits; scheduling is external (cron or a manual trigger).
//!
//! ## Architecture
//!
//! ```text
//! email_queue (PostgreSQL)
//!   ↓ (due batch, atomic claim)
//! QueueWorker<Pg repositories, SmtpTransport>
//!   ↓ (render template, send via SMTP)
//! email_logs (one entry per attempt)
//! ```

use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use database::postgres::{connect_from_config_with_retry, run_migrations, PostgresConfig};
use domain_mailer::{
    PgLogRepository, PgQueueRepository, PgTemplateRepository, QueueWorker, SmtpTransport,
    WorkerConfig,
};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::{info, warn};

/// Run one worker invocation: connect, migrate, process one due batch,
/// report, exit.
///
/// # Errors
///
/// Returns an error when configuration is invalid, the database is
/// unreachable, or the due-batch read fails. Individual delivery failures
/// are absorbed into the batch report and do not fail the invocation.
pub async fn run() -> Result<()> {
    install_color_eyre();
    let environment = Environment::from_env();
    init_tracing(&environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Starting mailer worker"
    );
    info!("Environment: {:?}", environment);

    // Load PostgreSQL configuration from environment
    let pg_config =
        PostgresConfig::from_env().wrap_err("Failed to load PostgreSQL configuration")?;

    // Connect with retry logic
    info!("Connecting to PostgreSQL...");
    let db = connect_from_config_with_retry(pg_config, None)
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;

    run_migrations::<migration::Migrator>(&db, env!("CARGO_PKG_NAME"))
        .await
        .wrap_err("Failed to run migrations")?;

    // SMTP from env in production; Mailpit on localhost:1025 otherwise
    let transport = if environment.is_production() {
        SmtpTransport::from_env().wrap_err("Failed to configure SMTP transport")?
    } else {
        warn!("Development environment, using local Mailpit SMTP");
        SmtpTransport::mailpit().wrap_err("Failed to configure Mailpit transport")?
    };

    let worker = QueueWorker::new(
        Arc::new(PgTemplateRepository::new(db.clone())),
        Arc::new(PgQueueRepository::new(db.clone())),
        Arc::new(PgLogRepository::new(db)),
        Arc::new(transport),
        WorkerConfig::default(),
    );

    let report = worker
        .process_due_batch()
        .await
        .wrap_err("Failed to process email batch")?;

    info!(
        processed = report.processed,
        successful = report.successful,
        failed = report.failed,
        "Mailer worker finished"
    );

    Ok(())
}
