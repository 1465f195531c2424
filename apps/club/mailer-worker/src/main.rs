//! Mailer Worker - Entry Point
//!
//! Stateless batch worker that delivers queued emails.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    club_mailer_worker::run().await
}
