//! Email transport implementations.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    transport::smtp::authentication::Credentials,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{Email, MailError, Result};

/// Email transport trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an email.
    async fn send(&self, email: &Email) -> Result<()>;

    /// Check if the transport is healthy.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// SMTP security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    /// No encryption, for local relays only.
    None,
    /// STARTTLS upgrade (port 587).
    #[default]
    StartTls,
    /// Implicit TLS (port 465).
    Tls,
}

impl SmtpSecurity {
    /// The conventional mode for a port.
    pub fn for_port(port: u16) -> Self {
        match port {
            465 => SmtpSecurity::Tls,
            25 | 1025 => SmtpSecurity::None,
            _ => SmtpSecurity::StartTls,
        }
    }
}

/// SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl SmtpConfig {
    /// STARTTLS on port 587.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            security: SmtpSecurity::StartTls,
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the port and pick the matching security mode.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self.security = SmtpSecurity::for_port(port);
        self
    }

    /// Override the security mode.
    pub fn security(mut self, security: SmtpSecurity) -> Self {
        self.security = security;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// SMTP transport.
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpConfig,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let mut builder = match config.security {
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?,
        };

        builder = builder.port(config.port).timeout(Some(config.timeout));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        info!(
            host = %config.host,
            port = config.port,
            security = ?config.security,
            "SMTP transport initialized"
        );

        Ok(Self {
            transport: builder.build(),
            config,
        })
    }

    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        let message = email.to_lettre()?;

        debug!(to = ?email.to, subject = %email.subject, "Sending email via SMTP");
        self.transport.send(message).await?;
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.transport.test_connection().await.unwrap_or(false)
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        email.validate()?;
        info!(
            to = ?email.to.as_ref().map(|a| a.email.as_str()),
            subject = %email.subject,
            body = %email.text,
            "Email not sent: no SMTP host configured"
        );
        Ok(())
    }
}

/// Keeps sent messages in memory. Failures can be scripted per recipient.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<Email>>>,
    transient: Arc<Mutex<Vec<MailError>>>,
    rejected: Arc<Mutex<HashSet<String>>>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next sends with these errors, in order.
    pub async fn fail_next(&self, errors: impl IntoIterator<Item = MailError>) {
        self.transient.lock().await.extend(errors);
    }

    /// Permanently reject mail to `email`.
    pub async fn reject(&self, email: impl Into<String>) {
        self.rejected.lock().await.insert(email.into());
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }

    /// Report the transport as down in health checks.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        email.validate()?;

        {
            let mut transient = self.transient.lock().await;
            if !transient.is_empty() {
                return Err(transient.remove(0));
            }
        }

        if let Some(to) = &email.to
            && self.rejected.lock().await.contains(&to.email)
        {
            return Err(MailError::Rejected(format!("550 mailbox unavailable: {}", to.email)));
        }

        self.sent.lock().await.push(email.clone());
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        !self.unreachable.load(Ordering::SeqCst)
    }
}
