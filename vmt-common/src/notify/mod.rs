//! Reminder emails
//!
//! Selection and composition live here. Delivery goes through the
//! [`Mailer`] trait; the shipped mailers log messages or drop them into an
//! outbox directory for an external relay to pick up.

pub mod compose;
pub mod dispatch;
pub mod mailer;

pub use compose::{compose_reminder, compose_test_email, OutgoingEmail};
pub use dispatch::{dispatch_reminders, DispatchReport};
pub use mailer::{mailer_from_config, LogMailer, Mailer, OutboxMailer};
