//! Mailer with retries, usable as the reminder engine's notification sender.

use async_trait::async_trait;
use reminders_core::NotificationSender;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{Address, Email, LogTransport, Result, SmtpConfig, SmtpTransport, Transport};

/// Mailer configuration.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub from: Option<Address>,
    pub reply_to: Option<Address>,
    /// Extra attempts after the first failure.
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            from: None,
            reply_to: None,
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl MailerConfig {
    pub fn from(mut self, from: &str) -> Result<Self> {
        self.from = Some(Address::parse(from)?);
        Ok(self)
    }

    pub fn reply_to(mut self, reply_to: &str) -> Result<Self> {
        self.reply_to = Some(Address::parse(reply_to)?);
        Ok(self)
    }

    pub fn retries(mut self, count: u32, delay: Duration) -> Self {
        self.retry_count = count;
        self.retry_delay = delay;
        self
    }
}

/// Sends plain-text notices through a [`Transport`].
pub struct Mailer {
    transport: Arc<dyn Transport>,
    config: MailerConfig,
}

impl Mailer {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            config: MailerConfig::default(),
        }
    }

    /// Mailer over SMTP.
    pub fn smtp(config: SmtpConfig) -> Result<Self> {
        Ok(Self::new(SmtpTransport::new(config)?))
    }

    /// Mailer that only logs messages.
    pub fn log_only() -> Self {
        Self::new(LogTransport)
    }

    pub fn with_config(mut self, config: MailerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MailerConfig {
        &self.config
    }

    /// Send an email, filling in the configured sender and reply-to.
    pub async fn send(&self, email: Email) -> Result<()> {
        let email = self.apply_defaults(email);
        self.send_with_retry(&email).await
    }

    /// Send a text message to one address.
    pub async fn send_text(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.send(Email::to(to, subject, body)?).await
    }

    pub async fn is_healthy(&self) -> bool {
        self.transport.is_healthy().await
    }

    fn apply_defaults(&self, mut email: Email) -> Email {
        if email.from.is_none() {
            email.from = self.config.from.clone();
        }
        if email.reply_to.is_none() {
            email.reply_to = self.config.reply_to.clone();
        }
        email
    }

    async fn send_with_retry(&self, email: &Email) -> Result<()> {
        let mut attempt = 0;

        loop {
            match self.transport.send(email).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_retryable() || attempt >= self.config.retry_count => {
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    let delay = e.retry_after().unwrap_or(self.config.retry_delay);
                    warn!(attempt, error = %e, delay = ?delay, "Email send failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl NotificationSender for Mailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> reminders_core::Result<()> {
        self.send_text(to, subject, body).await?;
        debug!(to = %to, "Notice handed to transport");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.transport.is_healthy().await
    }
}
