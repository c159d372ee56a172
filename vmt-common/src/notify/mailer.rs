//! Mail transports

use crate::config::{MailConfig, MailTransport};
use crate::notify::OutgoingEmail;
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;

    /// Short transport name for logs and API responses
    fn name(&self) -> &'static str;
}

/// Logs every message instead of delivering it
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!(
            to = %email.to,
            subject = %email.subject,
            bytes = email.html_body.len(),
            "Reminder email (log transport)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Writes each message as an `.eml` file
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let now = Utc::now();
        let file_name = format!("{}-{}.eml", now.format("%Y%m%dT%H%M%S"), Uuid::new_v4());
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, email.to_rfc822(now)).await?;

        info!(to = %email.to, path = %path.display(), "Reminder email written to outbox");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "outbox"
    }
}

pub fn mailer_from_config(mail: &MailConfig, outbox_dir: PathBuf) -> Arc<dyn Mailer> {
    match mail.transport {
        MailTransport::Log => Arc::new(LogMailer),
        MailTransport::Outbox => Arc::new(OutboxMailer::new(outbox_dir)),
    }
}
