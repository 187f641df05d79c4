//! SMTP email notifier (async lettre).
//!
//! Every send is journaled: a `pending` audit record is written before the
//! SMTP attempt and flipped to `sent` or `failed` afterwards. Failed records
//! stay in the log until an operator retries them.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use upkeep_core::config::EmailConfig;
use upkeep_core::error::{Result, UpkeepError};
use upkeep_core::traits::NotificationSender;
use upkeep_core::types::{NotificationMessage, NotificationStatus};

use crate::log::NotificationLog;

pub struct EmailNotifier {
    config: EmailConfig,
    log: NotificationLog,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig, log: NotificationLog) -> Self {
        Self { config, log }
    }

    pub fn log(&self) -> &NotificationLog {
        &self.log
    }

    async fn send_smtp(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.display_name, self.config.effective_from())
                .parse()
                .map_err(|e| UpkeepError::Notification(format!("Invalid from: {e}")))?;

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| UpkeepError::Notification(format!("Invalid to: {e}")))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| UpkeepError::Notification(format!("Build email: {e}")))?;

        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
            .map_err(|e| UpkeepError::Notification(format!("SMTP relay: {e}")))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| UpkeepError::Notification(format!("SMTP send: {e}")))?;

        Ok(())
    }

    /// Journal the attempt, deliver, and settle the record either way.
    async fn deliver(&self, record_id: i64, to: &str, subject: &str, body: &str) -> Result<()> {
        if !self.config.is_configured() {
            let reason = "Email sending is disabled or not configured";
            self.log.mark_failed(record_id, reason)?;
            return Err(UpkeepError::Notification(reason.into()));
        }

        match self.send_smtp(to, subject, body).await {
            Ok(()) => {
                self.log.mark_sent(record_id)?;
                tracing::info!("📤 Email sent to {to}: {subject}");
                Ok(())
            }
            Err(e) => {
                self.log.mark_failed(record_id, &e.to_string())?;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl NotificationSender for EmailNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<()> {
        let record_id = self.log.create_pending(message)?;
        self.deliver(
            record_id,
            &message.recipient,
            &message.subject,
            &message.html_body,
        )
        .await
    }

    async fn retry(&self, notification_id: i64) -> Result<()> {
        let record = self.log.get(notification_id)?.ok_or_else(|| {
            UpkeepError::Notification(format!("No notification record #{notification_id}"))
        })?;
        if record.status == NotificationStatus::Sent {
            return Err(UpkeepError::Notification(format!(
                "Notification #{notification_id} was already sent"
            )));
        }
        tracing::info!("🔁 Retrying notification #{notification_id} to {}", record.recipient);
        self.deliver(
            notification_id,
            &record.recipient,
            &record.subject,
            &record.content,
        )
        .await
    }
}
