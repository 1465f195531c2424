//! Sea-ORM entities for the mailer tables.

pub mod email_log;
pub mod email_queue;
pub mod email_template;
